/// Directory names the scanner always skips, regardless of depth or the
/// caller's extension policy — VCS metadata, editor/IDE state, and
/// thumbnail caches that are never meaningful hash targets.
pub const BUILTIN_DIR_BLACKLIST: &[&str] =
    &[".git", ".vscode", ".idea", ".github", ".gitlab", "@eaDir", "__pycache__"];

pub fn is_blacklisted(dir_name: &str) -> bool {
    BUILTIN_DIR_BLACKLIST.contains(&dir_name)
}
