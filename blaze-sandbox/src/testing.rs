//! Stub compilers for unit tests

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Copies the source to the artifact path and marks it executable.
pub const COPYING_COMPILER: &str = r#"#!/bin/sh
mode="$1"
src="$2"
out="${src%.*}"
if [ "$mode" = "transpile" ]; then
    out="$out.go"
fi
cp "$src" "$out" && chmod +x "$out"
"#;

/// Always fails with a diagnostic on stderr.
pub const FAILING_COMPILER: &str = "#!/bin/sh\necho \"line 1: syntax error\" >&2\nexit 1\n";

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
