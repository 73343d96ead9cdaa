//! Scenario templates for radar_love
//!
//! Built-in leak scenarios: each template names a target file and a content
//! skeleton with exactly one substitution slot for the generated secret.
//! The catalog is a closed, ordered set keyed by identifier; resolution
//! failure is a typed error, not a generic lookup miss.

use crate::secret::{SecretPatternKind, SyntheticSecret};
use camino::Utf8PathBuf;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Substitution slot in a content skeleton.
const SECRET_SLOT: &str = "{{secret}}";

/// Built-in scenario identifiers
pub const SCENARIO_CLOUD_CREDENTIAL_BASIC: &str = "cloud-credential-basic";
pub const SCENARIO_CLOUD_CREDENTIAL_TFVARS: &str = "cloud-credential-tfvars";
pub const SCENARIO_PRIVATE_KEY_DEPLOY: &str = "private-key-deploy";
pub const SCENARIO_GENERIC_TOKEN_SCRIPT: &str = "generic-token-script";

/// One scenario definition. Immutable once loaded; owned by the catalog.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScenarioTemplate {
    /// Catalog identifier
    pub id: &'static str,
    /// Human-readable name
    pub name: &'static str,
    /// Short description for the scenario listing
    pub description: &'static str,
    /// Default secret shape embedded by this scenario
    pub kind: SecretPatternKind,
    /// Default target path, relative to the repository root
    pub default_path: &'static str,
    /// Content skeleton with one [`SECRET_SLOT`]
    #[serde(skip)]
    skeleton: &'static str,
}

static CATALOG: LazyLock<BTreeMap<&'static str, ScenarioTemplate>> = LazyLock::new(|| {
    let templates = [
        ScenarioTemplate {
            id: SCENARIO_CLOUD_CREDENTIAL_BASIC,
            name: "Cloud credential in env file",
            description: "AWS access key ID committed in a deployment env file",
            kind: SecretPatternKind::CloudCredential,
            default_path: "config/production.env",
            skeleton: "\
# Production deployment settings
AWS_REGION=eu-west-1
AWS_ACCESS_KEY_ID={{secret}}
S3_BUCKET=releases
",
        },
        ScenarioTemplate {
            id: SCENARIO_CLOUD_CREDENTIAL_TFVARS,
            name: "Cloud credential in tfvars",
            description: "AWS access key ID committed in Terraform variables",
            kind: SecretPatternKind::CloudCredential,
            default_path: "terraform/prod.auto.tfvars",
            skeleton: "\
region     = \"eu-west-1\"
access_key = \"{{secret}}\"
instances  = 3
",
        },
        ScenarioTemplate {
            id: SCENARIO_PRIVATE_KEY_DEPLOY,
            name: "Private key in deploy directory",
            description: "PEM private key committed as a deploy key",
            kind: SecretPatternKind::PrivateKey,
            default_path: "deploy/deploy_key.pem",
            skeleton: "{{secret}}",
        },
        ScenarioTemplate {
            id: SCENARIO_GENERIC_TOKEN_SCRIPT,
            name: "API token in release script",
            description: "GitHub token hardcoded in a release shell script",
            kind: SecretPatternKind::GenericToken,
            default_path: "scripts/release.sh",
            skeleton: "\
#!/usr/bin/env bash
set -euo pipefail

export RELEASE_TOKEN={{secret}}
./scripts/publish.sh \"$RELEASE_TOKEN\"
",
        },
    ];

    templates.into_iter().map(|t| (t.id, t)).collect()
});

/// Scenario template errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("unknown scenario '{id}'; run 'radar_love scenarios' to list available scenarios")]
    NotFound { id: String },
}

/// Recognized resolution knobs.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Override the template's default secret shape
    pub pattern_kind: Option<SecretPatternKind>,
    /// Override the template's default target path
    pub file_name: Option<String>,
}

/// Concrete file content with the synthetic secret embedded.
#[derive(Debug, Clone)]
pub struct MaterializedArtifact {
    /// Scenario that produced this artifact
    pub scenario_id: String,
    /// Target path, relative to the repository root
    pub path: Utf8PathBuf,
    /// Rendered file content
    pub content: String,
    /// The embedded secret
    pub secret: SyntheticSecret,
}

/// List the catalog in identifier order.
#[must_use]
pub fn list_scenarios() -> Vec<&'static ScenarioTemplate> {
    CATALOG.values().collect()
}

/// Look up a template by identifier.
#[must_use]
pub fn get_scenario(id: &str) -> Option<&'static ScenarioTemplate> {
    CATALOG.get(id)
}

/// Resolve a scenario into a materialized artifact.
///
/// Generates the synthetic secret internally and substitutes it into the
/// skeleton. No disk or network I/O happens here.
///
/// # Errors
///
/// Returns [`TemplateError::NotFound`] if `id` is not in the catalog.
pub fn resolve(id: &str, options: &ResolveOptions) -> Result<MaterializedArtifact, TemplateError> {
    let template = get_scenario(id).ok_or_else(|| TemplateError::NotFound { id: id.to_string() })?;

    let kind = options.pattern_kind.unwrap_or(template.kind);
    let secret = SyntheticSecret::generate(kind);

    let path = options
        .file_name
        .as_deref()
        .unwrap_or(template.default_path);

    let content = template.skeleton.replace(SECRET_SLOT, secret.value());

    Ok(MaterializedArtifact {
        scenario_id: template.id.to_string(),
        path: Utf8PathBuf::from(path),
        content,
        secret,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::classify;

    #[test]
    fn catalog_is_ordered_and_nonempty() {
        let scenarios = list_scenarios();
        assert!(scenarios.len() >= 4);
        let mut ids: Vec<&str> = scenarios.iter().map(|t| t.id).collect();
        let sorted = {
            let mut s = ids.clone();
            s.sort_unstable();
            s
        };
        assert_eq!(ids, sorted, "catalog iterates in identifier order");
        ids.dedup();
        assert_eq!(ids.len(), scenarios.len());
    }

    #[test]
    fn every_skeleton_has_exactly_one_slot() {
        for template in list_scenarios() {
            let count = template.skeleton.matches(SECRET_SLOT).count();
            assert_eq!(count, 1, "scenario {} has {count} slots", template.id);
        }
    }

    #[test]
    fn resolve_embeds_a_classifiable_secret() {
        for template in list_scenarios() {
            let artifact = resolve(template.id, &ResolveOptions::default()).unwrap();
            assert!(artifact.content.contains(artifact.secret.value()));
            assert_eq!(classify(artifact.secret.value()), Some(template.kind));
            assert_eq!(artifact.path, Utf8PathBuf::from(template.default_path));
        }
    }

    #[test]
    fn resolve_unknown_scenario_is_typed_error() {
        let err = resolve("no-such-scenario", &ResolveOptions::default()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { .. }));
    }

    #[test]
    fn pattern_kind_override_changes_secret_shape() {
        let options = ResolveOptions {
            pattern_kind: Some(SecretPatternKind::GenericToken),
            file_name: None,
        };
        let artifact = resolve(SCENARIO_CLOUD_CREDENTIAL_BASIC, &options).unwrap();
        assert_eq!(artifact.secret.kind(), SecretPatternKind::GenericToken);
        assert_eq!(
            classify(artifact.secret.value()),
            Some(SecretPatternKind::GenericToken)
        );
    }

    #[test]
    fn file_name_override_changes_target_path() {
        let options = ResolveOptions {
            pattern_kind: None,
            file_name: Some("notes/leak.txt".to_string()),
        };
        let artifact = resolve(SCENARIO_PRIVATE_KEY_DEPLOY, &options).unwrap();
        assert_eq!(artifact.path, Utf8PathBuf::from("notes/leak.txt"));
    }

    #[test]
    fn fresh_secret_per_resolution() {
        let a = resolve(SCENARIO_CLOUD_CREDENTIAL_BASIC, &ResolveOptions::default()).unwrap();
        let b = resolve(SCENARIO_CLOUD_CREDENTIAL_BASIC, &ResolveOptions::default()).unwrap();
        assert_ne!(a.secret.value(), b.secret.value());
    }
}
