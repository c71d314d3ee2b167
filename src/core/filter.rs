//! Keep only labeled instances.

use crate::event::Event;

/// Pass through events whose label at `label_index` is set; errors are kept.
pub fn filter_instances<I, E>(events: I, label_index: usize) -> impl Iterator<Item = Result<Event, E>>
where
    I: IntoIterator<Item = Result<Event, E>>,
{
    events.into_iter().filter(move |item| match item {
        Ok(event) => event.label(label_index).is_some(),
        Err(_) => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(timestamp: f64, label: Option<&str>) -> Event {
        Event {
            timestamp,
            sensors: vec![],
            labels: vec![None, label.map(str::to_string)],
        }
    }

    #[test]
    fn test_keeps_labeled_subsequence_in_order() {
        let events = vec![
            event(1.0, None),
            event(2.0, Some("Walk")),
            event(3.0, None),
            event(4.0, Some("Run")),
            event(5.0, Some("Walk")),
        ];
        let kept: Vec<f64> = filter_instances(events.into_iter().map(Ok::<_, ()>), 1)
            .map(|e| e.unwrap().timestamp)
            .collect();

        assert_eq!(kept, vec![2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_checks_only_the_given_field() {
        let mut other = event(1.0, None);
        other.labels[0] = Some("Cook".into());
        let kept = filter_instances(vec![Ok::<_, ()>(other)], 1).count();
        assert_eq!(kept, 0);
    }

    #[test]
    fn test_errors_pass_through() {
        let source = vec![Ok(event(1.0, None)), Err("broken")];
        let out: Vec<_> = filter_instances(source, 1).collect();
        assert_eq!(out, vec![Err("broken")]);
    }
}
