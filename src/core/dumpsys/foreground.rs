use crate::core::cmd::run_cmd_timeout_async;
use memchr::{memchr, memmem};

/// Package of the resumed activity, `None` when nothing is resumed or the
/// dump timed out.
pub async fn foreground_package() -> anyhow::Result<Option<String>> {
    let out = match run_cmd_timeout_async("dumpsys", &["activity", "activities"], 1000).await {
        Ok(o) => o,
        Err(e) => {
            tracing::debug!(target: "gameboost::dumpsys", "dumpsys activity failed: {:?}", e);
            return Ok(None);
        }
    };

    Ok(parse_resumed(&out.stdout))
}

/// Scans `mResumedActivity`/`topResumedActivity` lines for
/// `ActivityRecord{hash u0 com.pkg/.Main t12}`.
pub fn parse_resumed(data: &[u8]) -> Option<String> {
    let finder = memmem::Finder::new(b"ResumedActivity");
    let mut pos = 0;

    while let Some(offset) = finder.find(&data[pos..]) {
        let hit = pos + offset;
        let end = memchr(b'\n', &data[hit..]).map_or(data.len(), |p| hit + p);

        if let Some(pkg) = package_after_user(&data[hit..end]) {
            return Some(pkg);
        }
        pos = end;
        if pos >= data.len() {
            break;
        }
    }
    None
}

fn package_after_user(line: &[u8]) -> Option<String> {
    let start = memmem::find(line, b" u0 ")? + 4;
    let rest = &line[start..];
    let slash = memchr(b'/', rest)?;
    let pkg = std::str::from_utf8(&rest[..slash]).ok()?.trim();

    (pkg.contains('.') && !pkg.contains(' ')).then(|| pkg.to_string())
}
