//! Shared backend types and package-diff parsing

use std::sync::LazyLock;

use regex::Regex;

use crate::core::{Result, UpmonError};

/// Packages whose upgrade needs extra attention from the user: kernels and
/// the initrd generator, the init system, the desktop shell, and browsers.
static IMPORTANT_PACKAGES: &[&str] = &[
    "linux",
    "linux-lts",
    "linux-zen",
    "linux-hardened",
    "mkinitcpio",
    "systemd",
    "gdm",
    "gnome-shell",
    "firefox",
    "vivaldi",
];

/// Matches `name old_version -> new_version [optional trailing annotation]`.
static PACKAGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    // The pattern is a constant and always compiles
    #[allow(clippy::expect_used)]
    Regex::new(r"^([^ ]+) ([^ ]+) -> ([^ ]+)( .+)?$").expect("package line pattern is valid")
});

/// A package which is going to be updated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUpdate {
    /// The package name
    pub name: String,
    /// The currently installed version
    pub old_version: String,
    /// The version the staged update installs
    pub new_version: String,
    /// Whether upgrading this package requires attention by the user
    pub important: bool,
}

/// Parse one line of a package manager's update diff.
///
/// A line that does not match the expected shape is an error, not a skip: a
/// malformed line means the assumptions about the external tool's output no
/// longer hold, and partial data could mislead the user.
pub fn parse_package_update(line: &str) -> Result<PackageUpdate> {
    let captures = PACKAGE_LINE
        .captures(line)
        .ok_or_else(|| UpmonError::PackageLine { line: line.into() })?;

    let name = &captures[1];
    Ok(PackageUpdate {
        name: name.into(),
        old_version: captures[2].into(),
        new_version: captures[3].into(),
        important: IMPORTANT_PACKAGES.contains(&name),
    })
}
