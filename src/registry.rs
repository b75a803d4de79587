use crate::*;
use ed25519_dalek::PublicKey;
use log::info;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-organization aggregate, keyed by [`OrgId`] in the registry.
///
/// Created implicitly on the first admin grant; the election list survives
/// removal of the last admin.
#[derive(Debug, Clone, Default)]
pub struct Organization {
    pub admins: Vec<PublicKey>,
    pub election_ids: Vec<ElectionId>,
}

impl Organization {
    pub fn has_admin(&self, who: &PublicKey) -> bool {
        self.admins.iter().any(|admin| admin == who)
    }
}

/// Organization admin membership and election records.
///
/// Single source of truth for whether an election is currently votable. The
/// platform admin is fixed at construction and is the only identity allowed
/// to grant or revoke org admins and to toggle election status.
pub struct ElectionRegistry {
    address: Address,
    platform_admin: PublicKey,
    orgs: BTreeMap<OrgId, Organization>,
    elections: BTreeMap<ElectionId, Election>,
    next_election_id: ElectionId,
    clock: Arc<dyn Clock>,
    events: Vec<Event>,
}

impl ElectionRegistry {
    pub fn new(platform_admin: PublicKey, clock: Arc<dyn Clock>) -> Self {
        ElectionRegistry {
            address: Address::random(),
            platform_admin,
            orgs: BTreeMap::new(),
            elections: BTreeMap::new(),
            next_election_id: 1,
            clock,
            events: Vec::new(),
        }
    }

    /// Grant `admin` the org-admin role for `org_id`.
    pub fn add_org_admin(
        &mut self,
        caller: &PublicKey,
        org_id: OrgId,
        admin: PublicKey,
    ) -> Result<(), ValidationError> {
        if caller != &self.platform_admin {
            return Err(ValidationError::NotPlatformAdmin);
        }
        if admin.as_bytes() == &[0u8; 32] {
            return Err(ValidationError::InvalidAdminAddress);
        }
        if self
            .orgs
            .get(&org_id)
            .map_or(false, |org| org.has_admin(&admin))
        {
            return Err(ValidationError::AlreadyAnAdmin(org_id));
        }

        self.orgs.entry(org_id).or_default().admins.push(admin);
        info!("registry: org admin added to organization {}", org_id);
        self.events.push(Event::OrgAdminAdded {
            org_id,
            admin,
            added_by: *caller,
        });
        Ok(())
    }

    /// Revoke the org-admin role. Fails if `admin` never held it.
    pub fn remove_org_admin(
        &mut self,
        caller: &PublicKey,
        org_id: OrgId,
        admin: &PublicKey,
    ) -> Result<(), ValidationError> {
        if caller != &self.platform_admin {
            return Err(ValidationError::NotPlatformAdmin);
        }
        let position = self
            .orgs
            .get(&org_id)
            .and_then(|org| org.admins.iter().position(|a| a == admin))
            .ok_or(ValidationError::NotAnAdmin(org_id))?;

        // The org entry exists - the position lookup above proved it
        self.orgs.get_mut(&org_id).unwrap().admins.remove(position);
        info!("registry: org admin removed from organization {}", org_id);
        self.events.push(Event::OrgAdminRemoved {
            org_id,
            admin: *admin,
            removed_by: *caller,
        });
        Ok(())
    }

    /// Create an election for `org_id` and return its id.
    ///
    /// Validation is all-or-nothing: a failed attempt never consumes an
    /// election id.
    pub fn create_election(
        &mut self,
        caller: &PublicKey,
        org_id: OrgId,
        name: String,
        description: String,
        start_time: Timestamp,
        end_time: Timestamp,
        candidates: Vec<String>,
    ) -> Result<ElectionId, ValidationError> {
        if !self.is_org_admin(org_id, caller) {
            return Err(ValidationError::NotOrgAdmin(org_id));
        }
        if name.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        let now = self.clock.now();
        if start_time <= now {
            return Err(ValidationError::StartTimeMustBeInFuture);
        }
        if end_time <= start_time {
            return Err(ValidationError::InvalidTimeRange);
        }
        if candidates.is_empty() {
            return Err(ValidationError::NoCandidatesProvided);
        }

        let id = self.next_election_id;
        let election = Election {
            id,
            org_id,
            name: name.clone(),
            description,
            start_time,
            end_time,
            active: true,
            candidates,
            creator: *caller,
            created_at: now,
        };
        self.elections.insert(id, election);
        // The org entry exists - the caller is one of its admins
        self.orgs.get_mut(&org_id).unwrap().election_ids.push(id);
        self.next_election_id += 1;

        info!(
            "registry: election {} created for organization {}",
            id, org_id
        );
        self.events.push(Event::ElectionCreated {
            org_id,
            election_id: id,
            name,
            creator: *caller,
            start_time,
            end_time,
        });
        Ok(id)
    }

    /// Flip the admin active flag. Returns the new value.
    pub fn toggle_election_status(
        &mut self,
        caller: &PublicKey,
        election_id: ElectionId,
    ) -> Result<bool, ValidationError> {
        if caller != &self.platform_admin {
            return Err(ValidationError::NotPlatformAdmin);
        }
        let election = self
            .elections
            .get_mut(&election_id)
            .ok_or(ValidationError::ElectionNotFound(election_id))?;
        election.active = !election.active;
        let is_active = election.active;

        info!(
            "registry: election {} active flag set to {}",
            election_id, is_active
        );
        self.events.push(Event::ElectionStatusChanged {
            election_id,
            is_active,
            changed_by: *caller,
        });
        Ok(is_active)
    }

    pub fn get_election(&self, id: ElectionId) -> Result<&Election, ValidationError> {
        self.elections
            .get(&id)
            .ok_or(ValidationError::ElectionNotFound(id))
    }

    /// Active flag AND current time inside the voting window (inclusive).
    pub fn is_election_active(&self, id: ElectionId) -> Result<bool, ValidationError> {
        let election = self.get_election(id)?;
        Ok(election.is_votable_at(self.clock.now()))
    }

    /// All election ids created for an organization, oldest first.
    pub fn org_elections(&self, org_id: OrgId) -> &[ElectionId] {
        self.orgs
            .get(&org_id)
            .map(|org| org.election_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_org_admin(&self, org_id: OrgId, who: &PublicKey) -> bool {
        self.orgs
            .get(&org_id)
            .map_or(false, |org| org.has_admin(who))
    }

    pub fn platform_admin(&self) -> &PublicKey {
        &self.platform_admin
    }

    /// Number of elections ever created.
    pub fn election_count(&self) -> u64 {
        self.next_election_id - 1
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
