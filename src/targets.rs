/// Android ABIs understood by the fallback recipe
///
/// Each entry is `(abi, host triple, clang target prefix)`. The host triple
/// goes to `configure --host`; the clang prefix names the NDK compiler
/// wrapper (`<prefix><api>-clang`).
///
/// To add support for a new ABI, add an entry to this table.
pub const SUPPORTED_ARCHS: &[(&str, &str, &str)] = &[
    ("armeabi-v7a", "arm-linux-androideabi", "armv7a-linux-androideabi"),
    ("arm64-v8a", "aarch64-linux-android", "aarch64-linux-android"),
    ("x86", "i686-linux-android", "i686-linux-android"),
    ("x86_64", "x86_64-linux-android", "x86_64-linux-android"),
];

/// Minimum API level used when none is supplied
pub const DEFAULT_ANDROID_API: u32 = 21;

/// Returns a list of all supported ABI names
pub fn supported_archs() -> Vec<&'static str> {
    SUPPORTED_ARCHS.iter().map(|(abi, _, _)| *abi).collect()
}

/// Maps an ABI name to its autoconf host triple
///
/// Returns `None` if the ABI is not supported
pub fn host_triple(abi: &str) -> Option<&'static str> {
    SUPPORTED_ARCHS
        .iter()
        .find(|(a, _, _)| *a == abi)
        .map(|(_, triple, _)| *triple)
}

/// Maps an ABI name to the NDK clang target prefix
pub fn clang_prefix(abi: &str) -> Option<&'static str> {
    SUPPORTED_ARCHS
        .iter()
        .find(|(a, _, _)| *a == abi)
        .map(|(_, _, prefix)| *prefix)
}

/// NDK prebuilt host tag for the machine running the build
pub fn ndk_host_tag() -> &'static str {
    if cfg!(target_os = "macos") {
        "darwin-x86_64"
    } else if cfg!(target_os = "windows") {
        "windows-x86_64"
    } else {
        "linux-x86_64"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_triples() {
        assert_eq!(host_triple("arm64-v8a"), Some("aarch64-linux-android"));
        assert_eq!(host_triple("armeabi-v7a"), Some("arm-linux-androideabi"));
        assert_eq!(host_triple("x86"), Some("i686-linux-android"));
        assert_eq!(host_triple("mips"), None);
    }

    #[test]
    fn test_clang_prefix_differs_for_armv7() {
        assert_eq!(clang_prefix("armeabi-v7a"), Some("armv7a-linux-androideabi"));
        assert_eq!(clang_prefix("x86_64"), Some("x86_64-linux-android"));
    }

    #[test]
    fn test_supported_archs_order() {
        assert_eq!(
            supported_archs(),
            vec!["armeabi-v7a", "arm64-v8a", "x86", "x86_64"]
        );
    }
}
