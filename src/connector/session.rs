//! A connected TestRail session.
//!
//! Connecting resolves everything the other components read: the project,
//! its suite/section directory, the field catalog for the configured kind,
//! and the API user. All of it is fixed for the life of the session.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::catalog::{FieldCatalog, FieldNames, custom_system_name};
use super::classify::{CallKind, RemoteCaller};
use super::discovery::DiscoveryEngine;
use super::filter::SyncFilter;
use super::gateway::ArtifactGateway;
use super::hierarchy::HierarchyDirectory;
use crate::config::SessionConfig;
use crate::error::{Error, Result, Severity};
use crate::model::{Artifact, ArtifactKind, Fields, Project, value_to_string};
use crate::remote::{Endpoint, HttpTransport, Transport, server_root};

/// Connector name reported to the host.
pub const NAME: &str = "TestRail";

/// TestRail API generation this connector speaks.
pub const BACKEND_VERSION: &str = "TestRail API v2";

/// Everything resolved at connect time, plus the transport.
pub struct Session {
    transport: Box<dyn Transport>,
    config: SessionConfig,
    project: Project,
    directory: HierarchyDirectory,
    catalog: FieldCatalog,
    fields: FieldNames,
    user: Value,
}

impl Session {
    /// Connect over HTTP with the configured credentials.
    ///
    /// # Errors
    ///
    /// Every connect-time failure is unrecoverable.
    pub fn connect(config: SessionConfig) -> Result<Self> {
        let transport =
            HttpTransport::new(&config.url, &config.user, &config.password, config.timeout)
                .map_err(|e| {
                    Error::from_transport(
                        Severity::Unrecoverable,
                        "Could not set up the TestRail client",
                        config.url.clone(),
                        e,
                    )
                })?;
        Self::connect_with(Box::new(transport), config)
    }

    /// Connect through an already-built transport.
    ///
    /// # Errors
    ///
    /// Unrecoverable when no project or more than one project matches the
    /// configured name, or when the hierarchy, the field schema or the user
    /// cannot be read.
    pub fn connect_with(transport: Box<dyn Transport>, config: SessionConfig) -> Result<Self> {
        info!(
            url = %config.url,
            user = %config.user,
            project = %config.project,
            kind = %config.artifact_kind,
            "Connecting to TestRail"
        );
        if !config.flags.is_empty() {
            info!(flags = ?config.flags.names(), "Feature flags enabled");
        }

        let caller = RemoteCaller::new(transport.as_ref());
        let project = find_project(caller, &config.project)?;
        let directory = HierarchyDirectory::resolve(caller, &project, config.suite_ids.as_ref())?;
        let catalog = FieldCatalog::resolve(caller, config.artifact_kind, project.id)?;

        let user = caller.get(
            CallKind::Essential,
            &Endpoint::GetUserByEmail(config.user.clone()),
            || format!("Could not find TestRail user '{}'", config.user),
        )?;
        debug!(id = ?user.get("id"), name = ?user.get("name"), "TestRail user");

        let fields = FieldNames::new(&config);
        Ok(Self {
            transport,
            config,
            project,
            directory,
            catalog,
            fields,
            user,
        })
    }

    pub fn name(&self) -> &'static str {
        NAME
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn backend_version(&self) -> &'static str {
        BACKEND_VERSION
    }

    /// Nothing to release: the protocol is stateless request/response.
    pub fn disconnect(self) {
        info!("Disconnected from TestRail");
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn directory(&self) -> &HierarchyDirectory {
        &self.directory
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn field_names(&self) -> &FieldNames {
        &self.fields
    }

    pub fn user(&self) -> &Value {
        &self.user
    }

    pub fn kind(&self) -> ArtifactKind {
        self.config.artifact_kind
    }

    fn caller(&self) -> RemoteCaller<'_> {
        RemoteCaller::new(self.transport.as_ref())
    }

    pub fn gateway(&self) -> ArtifactGateway<'_> {
        ArtifactGateway::new(self.caller(), &self.project, self.directory.suites())
    }

    pub fn filter(&self) -> SyncFilter<'_> {
        SyncFilter::new(&self.fields.external_id)
    }

    pub fn discovery(&self) -> DiscoveryEngine<'_> {
        DiscoveryEngine::new(
            self.caller(),
            &self.project,
            self.directory.suites(),
            self.filter(),
            self.config.cutoff,
            self.config.flags,
        )
    }

    /// Whether `name` is a valid field of the configured kind.
    ///
    /// # Errors
    ///
    /// Unrecoverable for kinds without a field schema.
    pub fn field_exists(&self, name: &str) -> Result<bool> {
        self.catalog.exists(name)
    }

    /// Check that the configured id fields exist.
    ///
    /// Every missing field is logged; the result is `false` if any is missing.
    ///
    /// # Errors
    ///
    /// Unrecoverable for kinds without a field schema.
    pub fn validate(&self) -> Result<bool> {
        let config = &self.config;
        let checks = [
            ("ExternalIDField", Some(config.external_id_field.as_str())),
            ("IDField", config.id_field.as_deref()),
            ("ExternalEndUserIDField", config.end_user_id_field.as_deref()),
        ];

        let mut valid = true;
        for (key, field) in checks {
            let Some(field) = field else { continue };
            if !self.field_exists(field)? {
                error!(field, "TestRail <{key}> does not exist");
                valid = false;
            }
        }
        Ok(valid)
    }

    /// # Errors
    ///
    /// See [`DiscoveryEngine::find_new`].
    pub fn find_new(&self) -> Result<Vec<Artifact>> {
        self.discovery().find_new(self.kind())
    }

    /// # Errors
    ///
    /// See [`DiscoveryEngine::find_updates`].
    pub fn find_updates(&self, reference: chrono::DateTime<chrono::Utc>) -> Result<Vec<Artifact>> {
        self.discovery().find_updates(self.kind(), reference)
    }

    /// The single case whose external-id field equals `external_id`.
    ///
    /// # Errors
    ///
    /// Zero or several matches, or a failed listing, are recoverable. Only
    /// cases can be looked up this way.
    pub fn find_by_external_id(&self, external_id: &str) -> Result<Artifact> {
        let kind = self.kind();
        if kind != ArtifactKind::Case {
            return Err(Error::Unsupported {
                kind,
                operation: "find_by_external_id",
            });
        }

        let field = &self.fields.external_id;
        let mut matches = Vec::new();
        for suite in self.directory.suites() {
            let endpoint = Endpoint::GetCases {
                project: self.project.id,
                suite: Some(suite.id),
                filter: None,
            };
            let cases = self.caller().list(CallKind::PerItem, &endpoint, || {
                format!(
                    "Failed to find cases with a populated <ExternalIDField> in project id='{}'",
                    self.project.id
                )
            })?;
            matches.extend(
                cases
                    .into_iter()
                    .map(|c| Artifact::from_value(ArtifactKind::Case, c))
                    .filter(|c| c.get(field).map(value_to_string).as_deref() == Some(external_id)),
            );
        }

        match matches.len() {
            0 => Err(Error::ExternalIdNotFound {
                external_id: external_id.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            _ => {
                let ids: Vec<i64> = matches.iter().filter_map(Artifact::id).collect();
                warn!(external_id, ?ids, "More than one artifact found with the same external id");
                Err(Error::ExternalIdAmbiguous {
                    external_id: external_id.to_string(),
                    ids,
                })
            }
        }
    }

    /// Record the link to the work-item system on `artifact`.
    ///
    /// Writes the external id, the cross-link URL (pulled out of an
    /// `<a href=...>` tag) and the end-user id, each only when its field is
    /// configured. Results carry no link fields and are returned unchanged.
    ///
    /// # Errors
    ///
    /// See [`ArtifactGateway::update`].
    pub fn update_external_id_fields(
        &self,
        artifact: Artifact,
        external_id: Option<&str>,
        end_user_id: Option<&str>,
        item_link: Option<&str>,
    ) -> Result<Artifact> {
        if artifact.kind == ArtifactKind::Result {
            return Ok(artifact);
        }

        let mut delta = Fields::new();
        if let Some(external_id) = external_id {
            debug!(field = %self.fields.external_id, value = external_id, "Updating <ExternalIDField>");
            delta.insert(self.fields.external_id.clone(), Value::from(external_id));
        }
        if let (Some(link), Some(field)) = (item_link, &self.fields.item_link) {
            let url = link_url(link);
            debug!(%field, value = url, "Updating <CrosslinkUrlField>");
            delta.insert(field.clone(), Value::from(url));
        }
        if let Some(field) = &self.fields.end_user_id {
            debug!(%field, value = ?end_user_id, "Updating <ExternalEndUserIDField>");
            delta.insert(field.clone(), end_user_id.map_or(Value::Null, Value::from));
        }

        self.gateway().update(&artifact, delta)
    }

    /// HTML anchor to the artifact's page in the TestRail web UI.
    ///
    /// The link text is the configured id field's value, or `link`.
    pub fn object_link(&self, artifact: &Artifact) -> String {
        let text = self
            .config
            .id_field
            .as_deref()
            .and_then(|f| artifact.get(f).or_else(|| artifact.get(&custom_system_name(f))))
            .map_or_else(|| "link".to_string(), value_to_string);
        let id = artifact.id().map(|id| id.to_string()).unwrap_or_default();
        let root = server_root(&self.config.url);
        let href = match artifact.kind.view_path() {
            Some(view) => format!("{root}/index.php?/{view}/{id}"),
            None => format!("{root}/{id}"),
        };
        format!("<a href='{href}'>{text}</a>")
    }
}

/// Resolve the configured project name to exactly one project.
fn find_project(caller: RemoteCaller<'_>, name: &str) -> Result<Project> {
    let projects = caller.list(CallKind::Essential, &Endpoint::GetProjects, || {
        "Failed to list TestRail projects".to_string()
    })?;
    if projects.is_empty() {
        return Err(Error::unrecoverable(
            "No projects found in TestRail",
            Endpoint::GetProjects.to_string(),
        ));
    }

    let matching: Vec<&Value> = projects
        .iter()
        .filter(|p| p.get("name").and_then(Value::as_str) == Some(name))
        .collect();
    let [found] = matching.as_slice() else {
        return Err(Error::ProjectMatch {
            name: name.to_string(),
            found: matching.len(),
        });
    };

    let project = Project::from_value(found)
        .map_err(|e| Error::unrecoverable(e, Endpoint::GetProjects.to_string()))?;
    info!(
        id = project.id,
        name = %project.name,
        url = project.url.as_deref().unwrap_or(""),
        suite_mode = project.suite_mode.describe(),
        "Found TestRail project"
    );
    if let Some(completed) = project.completed_at() {
        info!(%completed, "Project is completed");
    }
    Ok(project)
}

/// The URL inside an `<a href='...'>` tag; anything else is returned as is.
fn link_url(link: &str) -> &str {
    let Some(start) = link.find("href=") else {
        return link;
    };
    let rest = &link[start + "href=".len()..];
    let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return link;
    };
    let rest = &rest[1..];
    rest.find(quote).map_or(link, |end| &rest[..end])
}
