//! The repository-listing dataset: its registry, typed records, and the
//! `Convert` facade that parses and renders them.
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::descriptor::{Descriptor, Property};
use crate::error::Result;
use crate::path_de::from_value_with_path;
use crate::registry::Registry;
use crate::value::TypedValue;

pub const REPO: &str = "Repo";
pub const LICENSE: &str = "License";
pub const OWNER: &str = "Owner";
pub const PERMISSIONS: &str = "Permissions";

static REGISTRY: Lazy<Registry> = Lazy::new(build_registry);

/// The built-in registry for repository records.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

fn closed(fields: Vec<(&str, Descriptor)>) -> Descriptor {
    Descriptor::closed_object(
        fields.into_iter().map(|(name, typ)| Property::same(name, typ)).collect(),
    )
}

fn build_registry() -> Registry {
    let s = Descriptor::string;
    let n = Descriptor::number;
    let b = Descriptor::boolean;
    Registry::new()
        .with(REPO, closed(vec![
            ("allow_forking", b()),
            ("archive_url", s()),
            ("archived", b()),
            ("assignees_url", s()),
            ("blobs_url", s()),
            ("branches_url", s()),
            ("clone_url", s()),
            ("collaborators_url", s()),
            ("comments_url", s()),
            ("commits_url", s()),
            ("compare_url", s()),
            ("contents_url", s()),
            ("contributors_url", s()),
            ("created_at", Descriptor::date()),
            ("default_branch", s()),
            ("deployments_url", s()),
            ("description", Descriptor::null()),
            ("disabled", b()),
            ("downloads_url", s()),
            ("events_url", s()),
            ("fork", b()),
            ("forks", n()),
            ("forks_count", n()),
            ("forks_url", s()),
            ("full_name", s()),
            ("git_commits_url", s()),
            ("git_refs_url", s()),
            ("git_tags_url", s()),
            ("git_url", s()),
            ("has_discussions", b()),
            ("has_downloads", b()),
            ("has_issues", b()),
            ("has_pages", b()),
            ("has_projects", b()),
            ("has_wiki", b()),
            ("homepage", Descriptor::null()),
            ("hooks_url", s()),
            ("html_url", s()),
            ("id", n()),
            ("is_template", b()),
            ("issue_comment_url", s()),
            ("issue_events_url", s()),
            ("issues_url", s()),
            ("keys_url", s()),
            ("labels_url", s()),
            ("language", s()),
            ("languages_url", s()),
            ("license", Descriptor::reference("License")),
            ("merges_url", s()),
            ("milestones_url", s()),
            ("mirror_url", Descriptor::null()),
            ("name", s()),
            ("node_id", s()),
            ("notifications_url", s()),
            ("open_issues", n()),
            ("open_issues_count", n()),
            ("owner", Descriptor::reference("Owner")),
            ("permissions", Descriptor::reference("Permissions")),
            ("private", b()),
            ("pulls_url", s()),
            ("pushed_at", Descriptor::date()),
            ("releases_url", s()),
            ("size", n()),
            ("ssh_url", s()),
            ("stargazers_count", n()),
            ("stargazers_url", s()),
            ("statuses_url", s()),
            ("subscribers_url", s()),
            ("subscription_url", s()),
            ("svn_url", s()),
            ("tags_url", s()),
            ("teams_url", s()),
            ("topics", Descriptor::array(Descriptor::any())),
            ("trees_url", s()),
            ("updated_at", Descriptor::date()),
            ("url", s()),
            ("visibility", s()),
            ("watchers", n()),
            ("watchers_count", n()),
            ("web_commit_signoff_required", b()),
        ]))
        .with(LICENSE, closed(vec![
            ("key", s()),
            ("name", s()),
            ("node_id", s()),
            ("spdx_id", s()),
            ("url", s()),
        ]))
        .with(OWNER, closed(vec![
            ("avatar_url", s()),
            ("events_url", s()),
            ("followers_url", s()),
            ("following_url", s()),
            ("gists_url", s()),
            ("gravatar_id", s()),
            ("html_url", s()),
            ("id", n()),
            ("login", s()),
            ("node_id", s()),
            ("organizations_url", s()),
            ("received_events_url", s()),
            ("repos_url", s()),
            ("site_admin", b()),
            ("starred_url", s()),
            ("subscriptions_url", s()),
            ("type", s()),
            ("url", s()),
        ]))
        .with(PERMISSIONS, closed(vec![
            ("admin", b()),
            ("maintain", b()),
            ("pull", b()),
            ("push", b()),
            ("triage", b()),
        ]))
}

// ————————————————————————————————————————————————————————————————————————————
// TYPED RECORDS
// ————————————————————————————————————————————————————————————————————————————

/// One repository record as returned by the organization repository listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repo {
    pub allow_forking: bool,
    pub archive_url: String,
    pub archived: bool,
    pub assignees_url: String,
    pub blobs_url: String,
    pub branches_url: String,
    pub clone_url: String,
    pub collaborators_url: String,
    pub comments_url: String,
    pub commits_url: String,
    pub compare_url: String,
    pub contents_url: String,
    pub contributors_url: String,
    /// Dates may come back as `null`.
    pub created_at: Option<DateTime<Utc>>,
    pub default_branch: String,
    pub deployments_url: String,
    pub description: Option<String>,
    pub disabled: bool,
    pub downloads_url: String,
    pub events_url: String,
    pub fork: bool,
    #[serde(with = "number")]
    pub forks: f64,
    #[serde(with = "number")]
    pub forks_count: f64,
    pub forks_url: String,
    pub full_name: String,
    pub git_commits_url: String,
    pub git_refs_url: String,
    pub git_tags_url: String,
    pub git_url: String,
    pub has_discussions: bool,
    pub has_downloads: bool,
    pub has_issues: bool,
    pub has_pages: bool,
    pub has_projects: bool,
    pub has_wiki: bool,
    pub homepage: Option<String>,
    pub hooks_url: String,
    pub html_url: String,
    #[serde(with = "number")]
    pub id: f64,
    pub is_template: bool,
    pub issue_comment_url: String,
    pub issue_events_url: String,
    pub issues_url: String,
    pub keys_url: String,
    pub labels_url: String,
    pub language: String,
    pub languages_url: String,
    pub license: License,
    pub merges_url: String,
    pub milestones_url: String,
    pub mirror_url: Option<String>,
    pub name: String,
    pub node_id: String,
    pub notifications_url: String,
    #[serde(with = "number")]
    pub open_issues: f64,
    #[serde(with = "number")]
    pub open_issues_count: f64,
    pub owner: Owner,
    pub permissions: Permissions,
    pub private: bool,
    pub pulls_url: String,
    pub pushed_at: Option<DateTime<Utc>>,
    pub releases_url: String,
    #[serde(with = "number")]
    pub size: f64,
    pub ssh_url: String,
    #[serde(with = "number")]
    pub stargazers_count: f64,
    pub stargazers_url: String,
    pub statuses_url: String,
    pub subscribers_url: String,
    pub subscription_url: String,
    pub svn_url: String,
    pub tags_url: String,
    pub teams_url: String,
    pub topics: Vec<serde_json::Value>,
    pub trees_url: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub url: String,
    pub visibility: String,
    #[serde(with = "number")]
    pub watchers: f64,
    #[serde(with = "number")]
    pub watchers_count: f64,
    pub web_commit_signoff_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub key: String,
    pub name: String,
    pub node_id: String,
    pub spdx_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub avatar_url: String,
    pub events_url: String,
    pub followers_url: String,
    pub following_url: String,
    pub gists_url: String,
    pub gravatar_id: String,
    pub html_url: String,
    #[serde(with = "number")]
    pub id: f64,
    pub login: String,
    pub node_id: String,
    pub organizations_url: String,
    pub received_events_url: String,
    pub repos_url: String,
    pub site_admin: bool,
    pub starred_url: String,
    pub subscriptions_url: String,
    pub r#type: String,
    pub url: String,
}

/// Permission flags of the authenticated viewer on a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permissions {
    pub admin: bool,
    pub maintain: bool,
    pub pull: bool,
    pub push: bool,
    pub triage: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERT
// ————————————————————————————————————————————————————————————————————————————

/// Parses repository JSON into typed records and renders them back,
/// validating against the built-in registry both ways.
pub struct Convert;

impl Convert {
    pub fn to_repo(json: &str) -> Result<Repo> {
        let typed = registry().decode(json, REPO)?;
        from_typed(&typed)
    }

    pub fn repo_to_json(value: &Repo) -> Result<String> {
        let typed = TypedValue::from_json(&serde_json::to_value(value)?);
        registry().encode(&typed, REPO)
    }

    /// The listing endpoint returns an array of records.
    pub fn to_repos(json: &str) -> Result<Vec<Repo>> {
        let val: serde_json::Value = serde_json::from_str(json)?;
        let typed = registry().cast(&val, &repo_list())?;
        from_typed(&typed)
    }

    pub fn repos_to_json(values: &[Repo]) -> Result<String> {
        let typed = TypedValue::from_json(&serde_json::to_value(values)?);
        let out = registry().uncast(&typed, &repo_list())?;
        Ok(serde_json::to_string_pretty(&out)?)
    }
}

/// Counts and ids are plain JSON numbers; whole values render without a
/// fractional part so records round-trip unchanged.
mod number {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(n: &f64, s: S) -> std::result::Result<S::Ok, S::Error> {
        crate::value::json_num_pref_i64(*n).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
        f64::deserialize(d)
    }
}

fn repo_list() -> Descriptor {
    Descriptor::array(Descriptor::reference(REPO))
}

fn from_typed<T: serde::de::DeserializeOwned>(typed: &TypedValue) -> Result<T> {
    from_value_with_path(typed.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    const GUILD_SITE: &str = include_str!("../fixtures/repos/ok_guild_site.json");
    const LISTING: &str = include_str!("../fixtures/repos/ok_listing.json");

    fn fixture() -> Value {
        serde_json::from_str(GUILD_SITE).unwrap()
    }

    fn with(key: &str, v: Value) -> String {
        let mut doc = fixture();
        doc[key] = v;
        doc.to_string()
    }

    #[test]
    fn registry_has_the_four_shapes() {
        let reg = registry();
        assert_eq!(reg.names().collect::<Vec<_>>(), vec![REPO, LICENSE, OWNER, PERMISSIONS]);
        assert!(reg.check().is_ok());
        let Some(Descriptor::Object(repo)) = reg.get(REPO) else { panic!("Repo is an object") };
        assert_eq!(repo.props.len(), 80);
        assert!(repo.is_closed());
    }

    #[test]
    fn decodes_full_record() {
        let repo = Convert::to_repo(GUILD_SITE).unwrap();
        assert_eq!(repo.created_at, Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(repo.license.key, "mit");
        assert_eq!(repo.owner.r#type, "Organization");
        assert!(repo.permissions.pull);
        assert_eq!(repo.description, None);
        assert_eq!(repo.topics, vec![json!("javascript"), json!("qwik")]);
    }

    #[test]
    fn typed_value_carries_dates() {
        let typed = registry().decode(GUILD_SITE, REPO).unwrap();
        let created = typed.get("created_at").and_then(TypedValue::as_date).unwrap();
        assert_eq!(*created, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let license = typed.get("license").unwrap();
        assert_eq!(license.get("key"), Some(&TypedValue::String("mit".into())));
    }

    #[test]
    fn round_trip_keeps_keys_and_values() {
        let repo = Convert::to_repo(GUILD_SITE).unwrap();
        let text = Convert::repo_to_json(&repo).unwrap();
        let mut back: Value = serde_json::from_str(&text).unwrap();
        let mut want = fixture();
        // dates are normalized to millisecond precision
        for key in ["created_at", "pushed_at", "updated_at"] {
            let ours = back[key].as_str().unwrap().to_string();
            let theirs = want[key].as_str().unwrap().replace("Z", ".000Z");
            assert_eq!(ours, theirs);
            back[key] = Value::Null;
            want[key] = Value::Null;
        }
        assert_eq!(back, want);
        let keys: Vec<_> = back.as_object().unwrap().keys().collect();
        let want_keys: Vec<_> = want.as_object().unwrap().keys().collect();
        assert_eq!(keys, want_keys);
    }

    #[test]
    fn numeric_date_is_rejected() {
        let err = Convert::to_repo(&with("created_at", json!(1577836800))).unwrap_err();
        assert!(err.is_shape_mismatch());
        assert_eq!(err.key(), Some("created_at"));
        assert!(err.to_string().contains("on Repo. Expected Date but got 1577836800"), "{err}");
    }

    #[test]
    fn null_date_is_accepted() {
        let repo = Convert::to_repo(&with("pushed_at", Value::Null)).unwrap();
        assert_eq!(repo.pushed_at, None);
    }

    #[test]
    fn every_missing_property_is_named() {
        let doc = fixture();
        for key in doc.as_object().unwrap().keys() {
            let mut broken = doc.clone();
            broken.as_object_mut().unwrap().remove(key);
            let err = Convert::to_repo(&broken.to_string()).unwrap_err();
            assert_eq!(err.key(), Some(key.as_str()), "{err}");
        }
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = Convert::to_repo(&with("stargazers", json!(5))).unwrap_err();
        assert_eq!(err.key(), Some("stargazers"));
        assert!(err.to_string().contains("Expected never"));
    }

    #[test]
    fn nested_errors_name_the_nested_shape() {
        let mut doc = fixture();
        doc["permissions"]["pull"] = json!("yes");
        let err = Convert::to_repo(&doc.to_string()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for key \"pull\" on Permissions. Expected boolean but got \"yes\""
        );
    }

    #[test]
    fn null_typed_fields_reject_text() {
        let err = Convert::to_repo(&with("description", json!("a guild site"))).unwrap_err();
        assert!(err.to_string().contains("Expected null"));
    }

    #[test]
    fn any_json_number_is_a_count() {
        let mut doc = fixture();
        doc["id"] = json!(-1);
        doc["size"] = json!(1.5);
        doc["forks"] = json!(2.0);
        doc["owner"]["id"] = json!(7.25);
        let repo = Convert::to_repo(&doc.to_string()).unwrap();
        assert_eq!(repo.id, -1.0);
        assert_eq!(repo.size, 1.5);
        assert_eq!(repo.forks, 2.0);
        assert_eq!(repo.owner.id, 7.25);

        let back: Value = serde_json::from_str(&Convert::repo_to_json(&repo).unwrap()).unwrap();
        assert_eq!(back["id"], json!(-1));
        assert_eq!(back["size"], json!(1.5));
        assert_eq!(back["forks"], json!(2));
    }

    #[test]
    fn listing_decodes_and_encodes() {
        let repos = Convert::to_repos(LISTING).unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[1].name, "rating-service");
        assert_eq!(repos[1].created_at, None);
        let text = Convert::repos_to_json(&repos).unwrap();
        let again = Convert::to_repos(&text).unwrap();
        assert_eq!(again, repos);
    }

    #[test]
    fn listing_must_be_an_array() {
        let err = Convert::to_repos(GUILD_SITE).unwrap_err();
        assert!(err.to_string().contains("Expected array"));
    }
}
