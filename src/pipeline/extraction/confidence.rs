/// Truncated mean of the strictly positive token confidences, 0 when there are none.
///
/// Sentinel (`-1`) and zero entries carry no information and are dropped.
pub fn aggregate_confidence(token_confidences: &[i32]) -> i32 {
    let (sum, count) = token_confidences
        .iter()
        .filter(|&&c| c > 0)
        .fold((0i64, 0i64), |(sum, count), &c| (sum + c as i64, count + 1));

    if count == 0 {
        return 0;
    }
    (sum / count) as i32
}
