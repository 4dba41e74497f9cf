//! Homebrew formula generation.
//!
//! Renders the `scorex` formula from the release table, so the formula and
//! the installer can never disagree about URLs, entry names or digests.

use crate::checksum;
use crate::error::{InstallError, Result};
use crate::platform::{Arch, OsFamily, PlatformDescriptor};
use crate::release::{BINARY_NAME, ReleaseTable, ReleaseTarget};
use crate::smoke::SMOKE_TEST_ARG;

pub const FORMULA_DESC: &str = "CLI for creating S-CORE skeleton projects";
pub const FORMULA_HOMEPAGE: &str = "https://github.com/eclipse-score/score_scrample";
pub const FORMULA_LICENSE: &str = "Apache-2.0";

/// Data for generating a Homebrew formula.
#[derive(Debug, Clone)]
pub struct FormulaData {
    /// Formula class name (e.g., "Scorex")
    pub class_name: String,
    pub desc: String,
    pub homepage: String,
    pub license: String,
    pub version: String,
    pub macos_arm64: ReleaseTarget,
    pub macos_x86_64: ReleaseTarget,
    pub linux_x86_64: ReleaseTarget,
}

impl FormulaData {
    /// Resolve every published platform; all of them need a real digest.
    pub fn from_table(table: &ReleaseTable, version: &str) -> Result<Self> {
        let resolve = |os: OsFamily, arch: Arch| {
            table.resolve(&PlatformDescriptor::new(os, arch), version)
        };
        let macos_arm64 = resolve(OsFamily::MacOs, Arch::Arm64)?;
        let macos_x86_64 = resolve(OsFamily::MacOs, Arch::X86_64)?;
        let linux_x86_64 = resolve(OsFamily::Linux, Arch::X86_64)?;

        let missing: Vec<&str> = [&macos_arm64, &macos_x86_64, &linux_x86_64]
            .into_iter()
            .filter(|t| !checksum::is_valid_digest(&t.expected_checksum))
            .map(|t| t.asset_name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(InstallError::configuration(format!(
                "no SHA-256 digest for {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            class_name: class_name(BINARY_NAME),
            desc: FORMULA_DESC.to_string(),
            homepage: FORMULA_HOMEPAGE.to_string(),
            license: FORMULA_LICENSE.to_string(),
            version: macos_arm64.version.clone(),
            macos_arm64,
            macos_x86_64,
            linux_x86_64,
        })
    }
}

fn class_name(binary: &str) -> String {
    let mut chars = binary.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Homebrew formula generator.
pub struct FormulaGenerator;

impl FormulaGenerator {
    /// Generates a Ruby formula from the data.
    #[must_use]
    pub fn generate(data: &FormulaData) -> String {
        let mut formula = format!(
            r#"class {} < Formula
  desc "{}"
  homepage "{}"
  version "{}"
  license "{}"
"#,
            data.class_name, data.desc, data.homepage, data.version, data.license
        );

        formula.push_str(&format!(
            r#"
  on_macos do
    if Hardware::CPU.arm?
      url "{}"
      sha256 "{}"
    else
      url "{}"
      sha256 "{}"
    end
  end
"#,
            data.macos_arm64.url,
            data.macos_arm64.expected_checksum,
            data.macos_x86_64.url,
            data.macos_x86_64.expected_checksum
        ));

        formula.push_str(&format!(
            r#"
  on_linux do
    if Hardware::CPU.intel?
      url "{}"
      sha256 "{}"
    end
  end
"#,
            data.linux_x86_64.url, data.linux_x86_64.expected_checksum
        ));

        formula.push_str(&format!(
            r#"
  def install
    if OS.mac?
      if Hardware::CPU.arm?
        bin.install "{arm}" => "{bin}"
      else
        bin.install "{intel}" => "{bin}"
      end
    elsif OS.linux?
      bin.install "{linux}" => "{bin}"
    end
  end
"#,
            arm = data.macos_arm64.archive_entry,
            intel = data.macos_x86_64.archive_entry,
            linux = data.linux_x86_64.archive_entry,
            bin = BINARY_NAME,
        ));

        // Ruby interpolation: `#{bin}` must reach the output literally
        formula.push_str(&format!(
            "\n  test do\n    system \"#{{bin}}/{}\", \"{}\"\n  end\nend\n",
            BINARY_NAME, SMOKE_TEST_ARG
        ));

        formula
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn table_with_digests(version: &str) -> ReleaseTable {
        let checksums = ["macos-arm64", "macos-x86_64", "linux-x86_64"]
            .iter()
            .enumerate()
            .map(|(i, platform)| {
                (
                    format!("scorex-{version}-{platform}.tar.gz"),
                    i.to_string().repeat(64),
                )
            })
            .collect::<HashMap<_, _>>();
        ReleaseTable::default().with_checksums(checksums)
    }

    #[test]
    fn test_generate_formula() {
        let data = FormulaData::from_table(&table_with_digests("0.1.0"), "0.1.0").unwrap();
        let formula = FormulaGenerator::generate(&data);

        assert!(formula.starts_with("class Scorex < Formula\n"));
        assert!(formula.contains("version \"0.1.0\""));
        assert!(formula.contains("license \"Apache-2.0\""));
        assert!(formula.contains(
            "url \"https://github.com/eclipse-score/score_scrample/releases/download/v0.1.0/scorex-0.1.0-macos-arm64.tar.gz\""
        ));
        assert!(formula.contains(&format!("sha256 \"{}\"", "2".repeat(64))));
        assert!(formula.contains("bin.install \"scorex-linux-x86_64\" => \"scorex\""));
        assert!(formula.contains("system \"#{bin}/scorex\", \"version\""));
        assert!(formula.ends_with("end\nend\n"));
    }

    #[test]
    fn test_linux_section_has_only_intel() {
        let data = FormulaData::from_table(&table_with_digests("0.1.0"), "0.1.0").unwrap();
        let formula = FormulaGenerator::generate(&data);

        let linux = formula.split("on_linux do").nth(1).unwrap();
        let linux = linux.split("def install").next().unwrap();
        assert!(linux.contains("Hardware::CPU.intel?"));
        assert!(!linux.contains("arm64"));
    }

    #[test]
    fn test_placeholder_digests_are_rejected() {
        let err = FormulaData::from_table(&ReleaseTable::default(), "0.1.0").unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, InstallError::Configuration { .. }));
        assert!(msg.contains("scorex-0.1.0-macos-arm64.tar.gz"));
        assert!(msg.contains("scorex-0.1.0-linux-x86_64.tar.gz"));
    }

    #[test]
    fn test_version_prefix_is_normalized() {
        let data = FormulaData::from_table(&table_with_digests("0.2.0"), "v0.2.0").unwrap();
        assert_eq!(data.version, "0.2.0");
    }

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("scorex"), "Scorex");
        assert_eq!(class_name(""), "");
    }
}
