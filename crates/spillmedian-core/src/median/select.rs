use crate::{
    error::InternalError,
    obs::sink::{MetricsEvent, record},
    sort::{SortValue, SortedSequence},
};

/// Zero-based median index: the exact middle for odd counts, the upper of
/// the two central elements for even counts. Never averages.
#[must_use]
pub const fn median_position(count: u64) -> u64 {
    count / 2
}

/// Select the median of a freshly sorted sequence holding `count` values.
pub fn select<T, Q>(sequence: &mut Q, count: u64) -> Result<T, InternalError>
where
    T: SortValue,
    Q: SortedSequence<T> + ?Sized,
{
    if count == 0 {
        return Err(InternalError::selector_invariant(
            "cannot select a median from an empty sequence",
        ));
    }

    let position = median_position(count);
    let value = select_nth(sequence, position)?;
    record(MetricsEvent::MedianSelected { count, position });

    Ok(value)
}

/// Order statistic: discard `position` elements, then take the next one.
///
/// A null at the selected position means the sequence holds values that
/// should have been filtered on insert, and is reported as an invariant
/// violation.
pub fn select_nth<T, Q>(sequence: &mut Q, position: u64) -> Result<T, InternalError>
where
    T: SortValue,
    Q: SortedSequence<T> + ?Sized,
{
    sequence.skip(position)?;
    let (value, _) = sequence.next_value()?;

    if value.is_null() {
        return Err(InternalError::selector_invariant(format!(
            "element at position {position} is null"
        )));
    }

    Ok(value)
}
