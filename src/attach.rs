//! Attachment byte storage under the data directory.
//!
//! Files land in `<attach_dir>/<qid>/<shortid>__<name>`. The caller appends
//! the returned descriptor to its question; the bytes are only served back
//! through the static file route, never read by the backend itself.

use std::fs;
use std::path::Path;

use uuid::Uuid;

use crate::domain::Attachment;
use crate::store::StoreError;
use crate::util::safe_file_name;

pub fn store_attachment(
  attach_dir: &Path,
  qid: &str,
  bytes: &[u8],
  name: &str,
  mime: &str,
) -> Result<Attachment, StoreError> {
  let folder = attach_dir.join(qid);
  fs::create_dir_all(&folder)?;

  let safe = safe_file_name(name);
  let mut prefix = Uuid::new_v4().simple().to_string();
  prefix.truncate(8);
  let stored = format!("{prefix}__{safe}");
  let path = folder.join(&stored);
  fs::write(&path, bytes)?;

  Ok(Attachment {
    name: safe,
    stored,
    path: path.to_string_lossy().into_owned(),
    mime: mime.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn stored_files_stay_inside_the_question_folder() {
    let dir = TempDir::new().unwrap();
    let descriptor =
      store_attachment(dir.path(), "q1", b"bytes", "../escape.pdf", "application/pdf").unwrap();

    assert_eq!(descriptor.name, ".._escape.pdf");
    assert!(descriptor.stored.ends_with("__.._escape.pdf"));
    assert_eq!(descriptor.mime, "application/pdf");

    let on_disk = dir.path().join("q1").join(&descriptor.stored);
    assert_eq!(fs::read(on_disk).unwrap(), b"bytes");
  }

  #[test]
  fn two_uploads_of_the_same_name_do_not_collide() {
    let dir = TempDir::new().unwrap();
    let a = store_attachment(dir.path(), "q1", b"one", "notes.txt", "text/plain").unwrap();
    let b = store_attachment(dir.path(), "q1", b"two", "notes.txt", "text/plain").unwrap();
    assert_ne!(a.stored, b.stored);
    assert_eq!(fs::read(a.path).unwrap(), b"one");
    assert_eq!(fs::read(b.path).unwrap(), b"two");
  }
}
