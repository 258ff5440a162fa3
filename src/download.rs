use crate::error::{Error, Result};
use crate::fetch::Fetch;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn tmp_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}

/// Downloads `url` to `dest` and returns the number of bytes written.
///
/// The body goes to `<dest>.tmp` first and is renamed onto `dest` only once
/// fully written, so a failed download never leaves a file at `dest`.
pub fn download_file<F: Fetch + ?Sized>(fetcher: &F, url: &str, dest: &Path) -> Result<u64> {
    let response = fetcher.get(url)?;
    if !response.is_success() {
        return Err(Error::Download {
            url: url.to_string(),
            status: response.status,
        });
    }

    let tmp = tmp_path(dest);
    let written = write_then_rename(&response.body, &tmp, dest);
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written?;
    log::info!("{} downloaded ({} bytes)", dest.display(), response.body.len());
    Ok(response.body.len() as u64)
}

fn write_then_rename(body: &[u8], tmp: &Path, dest: &Path) -> Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(body)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Response;

    struct Canned(u16, Vec<u8>);

    impl Fetch for Canned {
        fn get(&self, _url: &str) -> Result<Response> {
            Ok(Response {
                status: self.0,
                body: self.1.clone(),
            })
        }
    }

    #[test]
    fn tmp_path_appends_suffix() {
        let p = tmp_path(Path::new("out/EDR3_1.csv"));
        assert_eq!(p, PathBuf::from("out/EDR3_1.csv.tmp"));
    }

    #[test]
    fn writes_body_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("lc.csv");
        let body = b"hjd,camera,mag\n2458000.1,bd,12.1\n".to_vec();
        let n = download_file(&Canned(200, body.clone()), "http://x/lc.csv", &dest).unwrap();
        assert_eq!(n, body.len() as u64);
        assert_eq!(fs::read(&dest).unwrap(), body);
        assert!(!tmp_path(&dest).exists());
    }

    #[test]
    fn error_status_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("lc.csv");
        let err = download_file(&Canned(404, b"not found".to_vec()), "http://x/lc.csv", &dest)
            .unwrap_err();
        match err {
            Error::Download { status, .. } => assert_eq!(status, 404),
            other => panic!("expected download error, got {:?}", other),
        }
        assert!(!dest.exists());
        assert!(!tmp_path(&dest).exists());
    }

    #[test]
    fn failed_write_leaves_no_temporary() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing_dir").join("lc.csv");
        let err = download_file(&Canned(200, b"x".to_vec()), "http://x/lc.csv", &dest);
        assert!(matches!(err, Err(Error::Io(_))));
        assert!(!dest.exists());
    }
}
