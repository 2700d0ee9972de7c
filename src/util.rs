//! Small utility helpers used across modules.

/// Strip path separators from a client-supplied file name so it can only
/// land inside the attachment folder it was addressed to.
pub fn safe_file_name(name: &str) -> String {
  let cleaned: String = name
    .chars()
    .map(|c| if c == '/' || c == '\\' { '_' } else { c })
    .collect();
  let trimmed = cleaned.trim();
  if trimmed.is_empty() {
    "attachment".to_string()
  } else {
    trimmed.to_string()
  }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    s.to_string()
  } else {
    let cut = s
      .char_indices()
      .take_while(|(i, _)| *i <= max)
      .last()
      .map(|(i, _)| i)
      .unwrap_or(0);
    format!("{}... ({} bytes total)", &s[..cut], s.len())
  }
}
