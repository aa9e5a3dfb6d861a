//! Sample resource records covering every key arity.
//!
//! | Record                      | Keys | Configuration hierarchy                          |
//! |-----------------------------|------|--------------------------------------------------|
//! | [`SnmpGlobal`]              | 0    | `snmp`                                           |
//! | [`ApplicationSet`]          | 1    | `applications application-set <name>`            |
//! | [`SnmpSecurityToGroup`]     | 2    | `snmp v3 vacm security-to-group ...`             |
//! | [`TunnelPairPolicy`]        | 4    | `security policies from-zone ... to-zone ...`    |

use async_trait::async_trait;
use junos_lifecycle::{
    config_exists, join_id, ConfigExistence, FieldPath, FirstStage, NullIdentity, ReadByName,
    ReadByPair, ReadByQuad, ReadKeyless, ReadStrategy, Readable, Removable, RequireSecurityPlatform,
    StageFailure, Stageable,
};
use junos_session::output::{self, EMPTY_W};
use junos_session::ConfigSession;

fn quote(value: &str) -> String {
    format!("\"{}\"", value)
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches('"').to_string()
}

/// Global SNMP settings, a singleton.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnmpGlobal {
    /// Resource identity, `"snmp"` once the settings exist.
    pub id: Option<String>,
    /// `snmp contact`.
    pub contact: Option<String>,
    /// `snmp location`.
    pub location: Option<String>,
}

impl SnmpGlobal {
    /// Settings with both contact and location.
    pub fn new(contact: &str, location: &str) -> Self {
        Self {
            id: None,
            contact: Some(contact.to_string()),
            location: Some(location.to_string()),
        }
    }
}

impl NullIdentity for SnmpGlobal {
    fn null_id(&self) -> bool {
        self.id.is_none()
    }
}

#[async_trait]
impl Stageable for SnmpGlobal {
    async fn stage(&self, session: &mut ConfigSession) -> Result<(), StageFailure> {
        let mut lines = Vec::new();
        if let Some(contact) = &self.contact {
            lines.push(format!("set snmp contact {}", quote(contact)));
        }
        if let Some(location) = &self.location {
            lines.push(format!("set snmp location {}", quote(location)));
        }
        if lines.is_empty() {
            return Err(StageFailure::at_msg(
                FieldPath::root("contact"),
                "one of contact or location must be set",
            ));
        }
        session.stage(&lines).await?;
        Ok(())
    }
}

impl FirstStage for SnmpGlobal {
    fn fill_identity(&mut self) {
        self.id = Some("snmp".to_string());
    }
}

#[async_trait]
impl ReadKeyless for SnmpGlobal {
    async fn read_keyless(&mut self, session: &mut ConfigSession) -> anyhow::Result<()> {
        let reply = session
            .command(&output::show_config_display_set_relative("snmp"))
            .await?;
        if reply == EMPTY_W {
            return Ok(());
        }
        for line in output::display_set_lines(&reply) {
            if let Some(v) = line.strip_prefix("contact ") {
                self.contact = Some(unquote(v));
            } else if let Some(v) = line.strip_prefix("location ") {
                self.location = Some(unquote(v));
            }
        }
        if self.contact.is_some() || self.location.is_some() {
            self.id = Some("snmp".to_string());
        }
        Ok(())
    }
}

impl Readable for SnmpGlobal {
    fn read_strategy(&mut self) -> ReadStrategy<'_> {
        ReadStrategy::Keyless(self)
    }
}

#[async_trait]
impl Removable for SnmpGlobal {
    async fn remove(&self, session: &mut ConfigSession) -> anyhow::Result<()> {
        session.stage(&["delete snmp".to_string()]).await?;
        Ok(())
    }

    // Other resources own the rest of the snmp hierarchy.
    async fn remove_options(&self, session: &mut ConfigSession) -> anyhow::Result<()> {
        session
            .stage(&[
                "delete snmp contact".to_string(),
                "delete snmp location".to_string(),
            ])
            .await?;
        Ok(())
    }
}

/// `applications application-set <name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationSet {
    /// Resource identity, the set name once it exists.
    pub id: Option<String>,
    /// Set name.
    pub name: String,
    /// Member applications.
    pub applications: Vec<String>,
}

impl ApplicationSet {
    /// Planned application set.
    pub fn new(name: &str, applications: &[&str]) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            applications: applications.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Configuration hierarchy of the set.
    pub fn path(&self) -> String {
        format!("applications application-set {}", self.name)
    }

    /// Rejects creating a set that already exists.
    pub fn pre_check(&self) -> ConfigExistence {
        ConfigExistence::must_be_absent(self.path(), format!("application-set {:?}", self.name))
    }

    /// Verifies the set exists after commit.
    pub fn post_check(&self) -> ConfigExistence {
        ConfigExistence::must_exist(self.path(), format!("application-set {:?}", self.name))
    }
}

impl NullIdentity for ApplicationSet {
    fn null_id(&self) -> bool {
        self.id.is_none()
    }
}

#[async_trait]
impl Stageable for ApplicationSet {
    async fn stage(&self, session: &mut ConfigSession) -> Result<(), StageFailure> {
        if self.applications.is_empty() {
            return Err(StageFailure::at_msg(
                FieldPath::root("applications"),
                format!("no applications in application-set {:?}", self.name),
            ));
        }
        let path = self.path();
        let lines: Vec<String> = self
            .applications
            .iter()
            .map(|app| format!("set {} application {}", path, app))
            .collect();
        session.stage(&lines).await?;
        Ok(())
    }
}

impl FirstStage for ApplicationSet {
    fn fill_identity(&mut self) {
        self.id = Some(self.name.clone());
    }
}

#[async_trait]
impl ReadByName for ApplicationSet {
    async fn read_by_name(&mut self, name: &str, session: &mut ConfigSession) -> anyhow::Result<()> {
        let reply = session
            .command(&output::show_config_display_set_relative(&format!(
                "applications application-set {}",
                name
            )))
            .await?;
        if reply == EMPTY_W {
            return Ok(());
        }
        self.name = name.to_string();
        self.id = Some(name.to_string());
        for line in output::display_set_lines(&reply) {
            match line.strip_prefix("application ") {
                Some(app) => self.applications.push(app.to_string()),
                None => anyhow::bail!("unknown application-set statement {:?}", line),
            }
        }
        Ok(())
    }
}

impl Readable for ApplicationSet {
    fn read_strategy(&mut self) -> ReadStrategy<'_> {
        ReadStrategy::ByName(self)
    }
}

#[async_trait]
impl Removable for ApplicationSet {
    async fn remove(&self, session: &mut ConfigSession) -> anyhow::Result<()> {
        session.stage(&[format!("delete {}", self.path())]).await?;
        Ok(())
    }
}

/// `snmp v3 vacm security-to-group security-model <model> security-name <name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnmpSecurityToGroup {
    /// Resource identity, `<model>_-_<name>` once it exists.
    pub id: Option<String>,
    /// Security model (`usm`, `v1`, `v2c`).
    pub model: String,
    /// Security name.
    pub name: String,
    /// Group the name is mapped to.
    pub group: String,
}

impl SnmpSecurityToGroup {
    /// Planned mapping.
    pub fn new(model: &str, name: &str, group: &str) -> Self {
        Self {
            id: None,
            model: model.to_string(),
            name: name.to_string(),
            group: group.to_string(),
        }
    }

    fn path(model: &str, name: &str) -> String {
        format!(
            "snmp v3 vacm security-to-group security-model {} security-name {}",
            model, name
        )
    }
}

impl NullIdentity for SnmpSecurityToGroup {
    fn null_id(&self) -> bool {
        self.id.is_none()
    }
}

#[async_trait]
impl Stageable for SnmpSecurityToGroup {
    async fn stage(&self, session: &mut ConfigSession) -> Result<(), StageFailure> {
        if self.group.is_empty() {
            return Err(StageFailure::at_msg(FieldPath::root("group"), "group must not be empty"));
        }
        session
            .stage(&[format!(
                "set {} group {}",
                Self::path(&self.model, &self.name),
                self.group
            )])
            .await?;
        Ok(())
    }
}

impl FirstStage for SnmpSecurityToGroup {
    fn fill_identity(&mut self) {
        self.id = Some(join_id(&[&self.model, &self.name]));
    }
}

#[async_trait]
impl ReadByPair for SnmpSecurityToGroup {
    async fn read_by_pair(
        &mut self,
        model: &str,
        name: &str,
        session: &mut ConfigSession,
    ) -> anyhow::Result<()> {
        let reply = session
            .command(&output::show_config_display_set_relative(&Self::path(model, name)))
            .await?;
        if reply == EMPTY_W {
            return Ok(());
        }
        for line in output::display_set_lines(&reply) {
            if let Some(group) = line.strip_prefix("group ") {
                self.group = group.to_string();
            }
        }
        self.model = model.to_string();
        self.name = name.to_string();
        self.id = Some(join_id(&[model, name]));
        Ok(())
    }
}

impl Readable for SnmpSecurityToGroup {
    fn read_strategy(&mut self) -> ReadStrategy<'_> {
        ReadStrategy::ByPair(self)
    }
}

#[async_trait]
impl Removable for SnmpSecurityToGroup {
    async fn remove(&self, session: &mut ConfigSession) -> anyhow::Result<()> {
        session
            .stage(&[format!("delete {}", Self::path(&self.model, &self.name))])
            .await?;
        Ok(())
    }
}

/// Pair of tunnel policies pointing at each other across two zones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelPairPolicy {
    /// Resource identity, the four keys joined once it exists.
    pub id: Option<String>,
    /// First zone.
    pub zone_a: String,
    /// Policy from `zone_a` to `zone_b`.
    pub policy_a_to_b: String,
    /// Second zone.
    pub zone_b: String,
    /// Policy from `zone_b` to `zone_a`.
    pub policy_b_to_a: String,
}

impl TunnelPairPolicy {
    /// Planned pair.
    pub fn new(zone_a: &str, policy_a_to_b: &str, zone_b: &str, policy_b_to_a: &str) -> Self {
        Self {
            id: None,
            zone_a: zone_a.to_string(),
            policy_a_to_b: policy_a_to_b.to_string(),
            zone_b: zone_b.to_string(),
            policy_b_to_a: policy_b_to_a.to_string(),
        }
    }

    /// Rejects devices without security features.
    pub fn pre_check() -> RequireSecurityPlatform {
        RequireSecurityPlatform::new("security policies tunnel pair policy")
    }

    fn pair_path(from: &str, to: &str, policy: &str, pair: &str) -> String {
        format!(
            "security policies from-zone {} to-zone {} policy {} then permit tunnel pair-policy {}",
            from, to, policy, pair
        )
    }

    fn paths(&self) -> [String; 2] {
        [
            Self::pair_path(&self.zone_a, &self.zone_b, &self.policy_a_to_b, &self.policy_b_to_a),
            Self::pair_path(&self.zone_b, &self.zone_a, &self.policy_b_to_a, &self.policy_a_to_b),
        ]
    }

    fn keys(&self) -> [&str; 4] {
        [
            self.zone_a.as_str(),
            self.policy_a_to_b.as_str(),
            self.zone_b.as_str(),
            self.policy_b_to_a.as_str(),
        ]
    }
}

impl NullIdentity for TunnelPairPolicy {
    fn null_id(&self) -> bool {
        self.id.is_none()
    }
}

#[async_trait]
impl Stageable for TunnelPairPolicy {
    async fn stage(&self, session: &mut ConfigSession) -> Result<(), StageFailure> {
        let lines: Vec<String> = self.paths().iter().map(|p| format!("set {}", p)).collect();
        session.stage(&lines).await?;
        Ok(())
    }
}

impl FirstStage for TunnelPairPolicy {
    fn fill_identity(&mut self) {
        self.id = Some(join_id(&self.keys()));
    }
}

#[async_trait]
impl ReadByQuad for TunnelPairPolicy {
    async fn read_by_quad(&mut self, keys: [&str; 4], session: &mut ConfigSession) -> anyhow::Result<()> {
        let [zone_a, policy_a_to_b, zone_b, policy_b_to_a] = keys;
        let forward = Self::pair_path(zone_a, zone_b, policy_a_to_b, policy_b_to_a);
        let reverse = Self::pair_path(zone_b, zone_a, policy_b_to_a, policy_a_to_b);
        if !config_exists(session, &forward).await? || !config_exists(session, &reverse).await? {
            return Ok(());
        }
        *self = Self::new(zone_a, policy_a_to_b, zone_b, policy_b_to_a);
        self.id = Some(join_id(&keys));
        Ok(())
    }
}

impl Readable for TunnelPairPolicy {
    fn read_strategy(&mut self) -> ReadStrategy<'_> {
        ReadStrategy::ByQuad(self)
    }
}

#[async_trait]
impl Removable for TunnelPairPolicy {
    async fn remove(&self, session: &mut ConfigSession) -> anyhow::Result<()> {
        let lines: Vec<String> = self.paths().iter().map(|p| format!("delete {}", p)).collect();
        session.stage(&lines).await?;
        Ok(())
    }
}
