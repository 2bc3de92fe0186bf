//! Small utility helpers used across modules.

use rand::Rng;

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// True if unicode char belongs to CJK ranges.
pub fn is_cjk(ch: char) -> bool {
  (ch >= '\u{4E00}' && ch <= '\u{9FFF}')
    || (ch >= '\u{3400}' && ch <= '\u{4DBF}')
    || (ch >= '\u{20000}' && ch <= '\u{2A6DF}')
    || (ch >= '\u{F900}' && ch <= '\u{FAFF}')
}

/// 8-char alphanumeric share code.
pub fn random_share_code() -> String {
  const ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";
  let mut rng = rand::thread_rng();
  (0..8)
    .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
    .collect()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    s.to_string()
  } else {
    let cut = s.char_indices().take_while(|(i, _)| *i < max).map(|(i, c)| i + c.len_utf8()).last().unwrap_or(0);
    format!("{}… ({} bytes total)", &s[..cut], s.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_fills_all_keys() {
    let out = fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and y and x");
  }

  #[test]
  fn share_codes_are_eight_alphanumerics() {
    let code = random_share_code();
    assert_eq!(code.chars().count(), 8);
    assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    let s = "街边饮奶茶街边饮奶茶";
    let t = trunc_for_log(s, 7);
    assert!(t.contains("bytes total"));
  }
}
