use crate::model::FieldValue;

/// Whether `b` should replace `a`: `b` is present and `a` is absent or
/// strictly shorter.
pub fn prefers_second(a: Option<&FieldValue>, b: Option<&FieldValue>) -> bool {
    match (a, b) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(a), Some(b)) => a.char_len() < b.char_len(),
    }
}

/// Pick the better of two candidates: the present one, or the longer one when
/// both are present. Equal lengths keep `a`.
pub fn choose(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Option<FieldValue> {
    if prefers_second(a, b) {
        b.cloned()
    } else {
        a.cloned()
    }
}

/// Longest candidate in order, returning the payload paired with its value.
/// The first one seen wins length ties.
pub fn longest<'a, T, I>(candidates: I) -> Option<T>
where
    I: IntoIterator<Item = (&'a FieldValue, T)>,
{
    let mut best: Option<(&'a FieldValue, T)> = None;
    for (value, payload) in candidates {
        if prefers_second(best.as_ref().map(|(v, _)| *v), Some(value)) {
            best = Some((value, payload));
        }
    }
    best.map(|(_, payload)| payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.into())
    }

    #[test]
    fn present_beats_absent() {
        let eu = text("EU");
        assert_eq!(choose(Some(&eu), None), Some(eu.clone()));
        assert_eq!(choose(None, Some(&eu)), Some(eu));
        assert_eq!(choose(None, None), None);
    }

    #[test]
    fn longer_wins_either_order() {
        let short = text("EU");
        let long = text("EU,US,Asia");
        assert_eq!(choose(Some(&short), Some(&long)), Some(long.clone()));
        assert_eq!(choose(Some(&long), Some(&short)), Some(long));
    }

    #[test]
    fn equal_length_keeps_left() {
        let a = text("欧洲");
        let b = text("美国");
        assert_eq!(choose(Some(&a), Some(&b)), Some(a.clone()));
        assert_eq!(choose(Some(&b), Some(&a)), Some(b));
    }

    #[test]
    fn length_is_in_characters() {
        // 4 characters / 12 bytes vs 5 characters / 5 bytes
        let cjk = text("东南亚国");
        let latin = text("Japan");
        assert_eq!(choose(Some(&cjk), Some(&latin)), Some(latin));
    }

    #[test]
    fn longest_prefers_first_on_ties() {
        let values = [text("US"), text("EU,US"), text("Asia,"), text("EU")];
        assert_eq!(longest(values.iter().zip(0..)), Some(1));
        assert_eq!(longest(std::iter::empty::<(&FieldValue, usize)>()), None);
    }

    #[test]
    fn second_replaces_only_when_strictly_better() {
        let eu = text("EU");
        let us = text("US");
        assert!(prefers_second(None, Some(&eu)));
        assert!(!prefers_second(Some(&eu), None));
        assert!(!prefers_second(Some(&eu), Some(&us)));
        assert!(prefers_second(Some(&eu), Some(&text("EU,US"))));
        assert!(!prefers_second(None, None));
    }
}
