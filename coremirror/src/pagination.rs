// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Slicing of label and label value listings.

/// Return the first `limit` labels and whether more were available.
pub fn paginate_labels(mut labels: Vec<String>, limit: usize) -> (bool, Vec<String>) {
  let is_partial = limit < labels.len();
  labels.truncate(limit);
  (is_partial, labels)
}

/// Return a page of label values starting with `prefix`, and whether more values follow the page.
///
/// An `offset` past the end of the filtered values is moved back to the last value.
pub fn paginate_label_values(
  values: Vec<String>,
  prefix: Option<&str>,
  offset: usize,
  limit: usize,
) -> (bool, Vec<String>) {
  let filtered: Vec<String> = match prefix {
    Some(prefix) => values
      .into_iter()
      .filter(|value| value.starts_with(prefix))
      .collect(),
    None => values,
  };

  if filtered.is_empty() {
    return (false, filtered);
  }

  let offset = if offset > filtered.len() {
    filtered.len() - 1
  } else {
    offset
  };
  let end = offset.saturating_add(limit);
  let is_partial = end < filtered.len();

  let page = filtered
    .into_iter()
    .skip(offset)
    .take(limit)
    .collect();
  (is_partial, page)
}
