//! Routing state machine for products and order samples.
//!
//! Every product and every order sample is held by exactly one party, its
//! `routed_to` holder. [`RULES`] is the single transition table for both
//! entities: a transition is legal iff a rule matches
//! `(entity, holder, actor, action)` and the rule's guard accepts the current
//! stage and lock state. The API offers exactly the actions
//! [`allowed_actions`] returns and applies them through [`plan_transition`].

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::Role;

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// The kind of item being routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutedEntity {
    Product,
    Sample,
}

impl RoutedEntity {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutedEntity::Product => "product",
            RoutedEntity::Sample => "sample",
        }
    }
}

impl fmt::Display for RoutedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow stage of a product or sample (`product_status` / `sample_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Product created, waiting on the admin.
    Pending,
    /// Sample requested, waiting on the admin.
    Requested,
    SentToManufacturer,
    /// Manufacturer returned the product with pricing or questions.
    ManufacturerReviewed,
    SentToClient,
    ClientApproved,
    RevisionRequested,
    Approved,
    ReadyForProduction,
    InProduction,
    Shipped,
    Completed,
}

impl Stage {
    pub const ALL: [Stage; 12] = [
        Stage::Pending,
        Stage::Requested,
        Stage::SentToManufacturer,
        Stage::ManufacturerReviewed,
        Stage::SentToClient,
        Stage::ClientApproved,
        Stage::RevisionRequested,
        Stage::Approved,
        Stage::ReadyForProduction,
        Stage::InProduction,
        Stage::Shipped,
        Stage::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Requested => "requested",
            Stage::SentToManufacturer => "sent_to_manufacturer",
            Stage::ManufacturerReviewed => "manufacturer_reviewed",
            Stage::SentToClient => "sent_to_client",
            Stage::ClientApproved => "client_approved",
            Stage::RevisionRequested => "revision_requested",
            Stage::Approved => "approved",
            Stage::ReadyForProduction => "ready_for_production",
            Stage::InProduction => "in_production",
            Stage::Shipped => "shipped",
            Stage::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Stage::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| CoreError::Validation(format!("Unknown routing status '{value}'")))
    }

    /// The stage a freshly created item starts in.
    pub fn initial(entity: RoutedEntity) -> Stage {
        match entity {
            RoutedEntity::Product => Stage::Pending,
            RoutedEntity::Sample => Stage::Requested,
        }
    }

    /// Whether this stage belongs to the given entity's status vocabulary.
    pub fn applies_to(self, entity: RoutedEntity) -> bool {
        match self {
            Stage::Pending
            | Stage::ManufacturerReviewed
            | Stage::ClientApproved
            | Stage::ReadyForProduction
            | Stage::Completed => entity == RoutedEntity::Product,
            Stage::Requested => entity == RoutedEntity::Sample,
            _ => true,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action a user can take on a routed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "action", content = "destination", rename_all = "snake_case")]
pub enum RouteAction {
    /// Hand the item over to another holder.
    Route(Role),
    StartProduction,
    Ship,
    Approve,
    RequestRevision,
    Complete,
    Reopen,
}

impl RouteAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteAction::Route(_) => "route",
            RouteAction::StartProduction => "start_production",
            RouteAction::Ship => "ship",
            RouteAction::Approve => "approve",
            RouteAction::RequestRevision => "request_revision",
            RouteAction::Complete => "complete",
            RouteAction::Reopen => "reopen",
        }
    }

    /// Route destination, if this is a route action.
    pub fn destination(self) -> Option<Role> {
        match self {
            RouteAction::Route(role) => Some(role),
            _ => None,
        }
    }

    /// Build an action from its wire form (`action` plus optional `destination`).
    pub fn from_parts(action: &str, destination: Option<&str>) -> Result<Self, CoreError> {
        let parsed = match action {
            "route" => {
                let dest = destination.ok_or_else(|| {
                    CoreError::Validation("A route action requires a destination".into())
                })?;
                return Ok(RouteAction::Route(Role::parse(dest)?));
            }
            "start_production" => RouteAction::StartProduction,
            "ship" => RouteAction::Ship,
            "approve" => RouteAction::Approve,
            "request_revision" => RouteAction::RequestRevision,
            "complete" => RouteAction::Complete,
            "reopen" => RouteAction::Reopen,
            other => {
                return Err(CoreError::Validation(format!(
                    "Unknown routing action '{other}'"
                )))
            }
        };
        if destination.is_some() {
            return Err(CoreError::Validation(format!(
                "Action '{action}' does not take a destination"
            )));
        }
        Ok(parsed)
    }
}

impl fmt::Display for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteAction::Route(role) => write!(f, "route to {role}"),
            other => f.write_str(&other.as_str().replace('_', " ")),
        }
    }
}

/// Current routing position of a product or sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingState {
    pub holder: Role,
    pub stage: Stage,
    pub locked: bool,
}

impl RoutingState {
    /// Starting position: held by the admin, unlocked.
    pub fn initial(entity: RoutedEntity) -> Self {
        Self {
            holder: Role::Admin,
            stage: Stage::initial(entity),
            locked: false,
        }
    }

    /// Rebuild a state from its stored column values.
    pub fn from_columns(routed_to: &str, stage: &str, locked: bool) -> Result<Self, CoreError> {
        Ok(Self {
            holder: Role::parse(routed_to)?,
            stage: Stage::parse(stage)?,
            locked,
        })
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Which holders a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderReq {
    Is(Role),
    /// Any holder other than the admin (used by the admin recall rules).
    NotAdmin,
}

impl HolderReq {
    fn matches(self, holder: Role) -> bool {
        match self {
            HolderReq::Is(role) => role == holder,
            HolderReq::NotAdmin => holder != Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReq {
    Any,
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageReq {
    Any,
    OneOf(&'static [Stage]),
    NoneOf(&'static [Stage]),
}

/// Preconditions on the current stage and lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    pub lock: LockReq,
    pub stage: StageReq,
}

impl Guard {
    const UNLOCKED: Guard = Guard {
        lock: LockReq::Unlocked,
        stage: StageReq::Any,
    };

    const fn stage_in(stages: &'static [Stage]) -> Guard {
        Guard {
            lock: LockReq::Any,
            stage: StageReq::OneOf(stages),
        }
    }

    fn check(&self, entity: RoutedEntity, state: &RoutingState) -> Result<(), String> {
        match self.lock {
            LockReq::Locked if !state.locked => {
                return Err(format!("the {entity} is not locked"));
            }
            LockReq::Unlocked if state.locked => {
                return Err(format!("the {entity} is locked"));
            }
            _ => {}
        }
        match self.stage {
            StageReq::OneOf(stages) if !stages.contains(&state.stage) => Err(format!(
                "status must be one of: {} (current: {})",
                join_stages(stages),
                state.stage
            )),
            StageReq::NoneOf(stages) if stages.contains(&state.stage) => {
                Err(format!("not allowed while status is {}", state.stage))
            }
            _ => Ok(()),
        }
    }
}

fn join_stages(stages: &[Stage]) -> String {
    stages
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Who receives a notification for an applied transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyTarget {
    Holder(Role),
    /// Whoever held the item before the transition.
    PreviousHolder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockChange {
    Keep,
    Lock,
    Unlock,
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub entity: RoutedEntity,
    pub holder: HolderReq,
    pub actor: Role,
    pub action: RouteAction,
    pub guard: Guard,
    pub next_holder: Role,
    /// `None` leaves the stage unchanged.
    pub next_stage: Option<Stage>,
    pub lock: LockChange,
    pub notify: &'static [NotifyTarget],
}

use NotifyTarget::{Holder as N, PreviousHolder};
use RoutedEntity::{Product, Sample};
use Role::{Admin, Client, Manufacturer};

/// The complete transition table for products and samples.
pub static RULES: &[Rule] = &[
    // --- Products -----------------------------------------------------------
    Rule {
        entity: Product,
        holder: HolderReq::Is(Admin),
        actor: Admin,
        action: RouteAction::Route(Manufacturer),
        guard: Guard::UNLOCKED,
        next_holder: Manufacturer,
        next_stage: Some(Stage::SentToManufacturer),
        lock: LockChange::Keep,
        notify: &[N(Manufacturer)],
    },
    Rule {
        entity: Product,
        holder: HolderReq::Is(Admin),
        actor: Admin,
        action: RouteAction::Route(Manufacturer),
        guard: Guard {
            lock: LockReq::Locked,
            stage: StageReq::OneOf(&[Stage::Approved]),
        },
        next_holder: Manufacturer,
        next_stage: Some(Stage::ReadyForProduction),
        lock: LockChange::Keep,
        notify: &[N(Manufacturer)],
    },
    Rule {
        entity: Product,
        holder: HolderReq::Is(Admin),
        actor: Admin,
        action: RouteAction::Route(Client),
        guard: Guard::UNLOCKED,
        next_holder: Client,
        next_stage: Some(Stage::SentToClient),
        lock: LockChange::Keep,
        notify: &[N(Client)],
    },
    Rule {
        entity: Product,
        holder: HolderReq::Is(Admin),
        actor: Admin,
        action: RouteAction::Approve,
        guard: Guard::stage_in(&[Stage::ClientApproved]),
        next_holder: Admin,
        next_stage: Some(Stage::Approved),
        lock: LockChange::Lock,
        notify: &[N(Client)],
    },
    Rule {
        entity: Product,
        holder: HolderReq::Is(Admin),
        actor: Admin,
        action: RouteAction::Complete,
        guard: Guard::stage_in(&[Stage::Shipped]),
        next_holder: Admin,
        next_stage: Some(Stage::Completed),
        lock: LockChange::Keep,
        notify: &[N(Client), N(Manufacturer)],
    },
    Rule {
        entity: Product,
        holder: HolderReq::Is(Admin),
        actor: Admin,
        action: RouteAction::Reopen,
        guard: Guard {
            lock: LockReq::Locked,
            stage: StageReq::NoneOf(&[Stage::InProduction, Stage::Shipped, Stage::Completed]),
        },
        next_holder: Admin,
        next_stage: Some(Stage::Pending),
        lock: LockChange::Unlock,
        notify: &[],
    },
    Rule {
        entity: Product,
        holder: HolderReq::Is(Manufacturer),
        actor: Manufacturer,
        action: RouteAction::Route(Admin),
        guard: Guard::UNLOCKED,
        next_holder: Admin,
        next_stage: Some(Stage::ManufacturerReviewed),
        lock: LockChange::Keep,
        notify: &[N(Admin)],
    },
    Rule {
        entity: Product,
        holder: HolderReq::Is(Manufacturer),
        actor: Manufacturer,
        action: RouteAction::StartProduction,
        guard: Guard::stage_in(&[Stage::ReadyForProduction]),
        next_holder: Manufacturer,
        next_stage: Some(Stage::InProduction),
        lock: LockChange::Keep,
        notify: &[N(Admin)],
    },
    Rule {
        entity: Product,
        holder: HolderReq::Is(Manufacturer),
        actor: Manufacturer,
        action: RouteAction::Ship,
        guard: Guard::stage_in(&[Stage::InProduction]),
        next_holder: Admin,
        next_stage: Some(Stage::Shipped),
        lock: LockChange::Keep,
        notify: &[N(Admin), N(Client)],
    },
    Rule {
        entity: Product,
        holder: HolderReq::Is(Client),
        actor: Client,
        action: RouteAction::Approve,
        guard: Guard::stage_in(&[Stage::SentToClient]),
        next_holder: Admin,
        next_stage: Some(Stage::ClientApproved),
        lock: LockChange::Keep,
        notify: &[N(Admin)],
    },
    Rule {
        entity: Product,
        holder: HolderReq::Is(Client),
        actor: Client,
        action: RouteAction::RequestRevision,
        guard: Guard::stage_in(&[Stage::SentToClient]),
        next_holder: Admin,
        next_stage: Some(Stage::RevisionRequested),
        lock: LockChange::Keep,
        notify: &[N(Admin)],
    },
    Rule {
        entity: Product,
        holder: HolderReq::NotAdmin,
        actor: Admin,
        action: RouteAction::Route(Admin),
        guard: Guard {
            lock: LockReq::Any,
            stage: StageReq::NoneOf(&[Stage::InProduction]),
        },
        next_holder: Admin,
        next_stage: None,
        lock: LockChange::Keep,
        notify: &[PreviousHolder],
    },
    // --- Samples ------------------------------------------------------------
    Rule {
        entity: Sample,
        holder: HolderReq::Is(Admin),
        actor: Admin,
        action: RouteAction::Route(Manufacturer),
        guard: Guard::UNLOCKED,
        next_holder: Manufacturer,
        next_stage: Some(Stage::SentToManufacturer),
        lock: LockChange::Keep,
        notify: &[N(Manufacturer)],
    },
    Rule {
        entity: Sample,
        holder: HolderReq::Is(Admin),
        actor: Admin,
        action: RouteAction::Route(Client),
        guard: Guard {
            lock: LockReq::Unlocked,
            stage: StageReq::OneOf(&[Stage::Shipped]),
        },
        next_holder: Client,
        next_stage: Some(Stage::SentToClient),
        lock: LockChange::Keep,
        notify: &[N(Client)],
    },
    Rule {
        entity: Sample,
        holder: HolderReq::Is(Admin),
        actor: Admin,
        action: RouteAction::Approve,
        guard: Guard {
            lock: LockReq::Unlocked,
            stage: StageReq::OneOf(&[Stage::Shipped, Stage::SentToClient]),
        },
        next_holder: Admin,
        next_stage: Some(Stage::Approved),
        lock: LockChange::Lock,
        notify: &[N(Client), N(Manufacturer)],
    },
    Rule {
        entity: Sample,
        holder: HolderReq::Is(Admin),
        actor: Admin,
        action: RouteAction::Reopen,
        guard: Guard {
            lock: LockReq::Locked,
            stage: StageReq::Any,
        },
        next_holder: Admin,
        next_stage: Some(Stage::Requested),
        lock: LockChange::Unlock,
        notify: &[],
    },
    Rule {
        entity: Sample,
        holder: HolderReq::Is(Manufacturer),
        actor: Manufacturer,
        action: RouteAction::StartProduction,
        guard: Guard::stage_in(&[Stage::SentToManufacturer]),
        next_holder: Manufacturer,
        next_stage: Some(Stage::InProduction),
        lock: LockChange::Keep,
        notify: &[N(Admin)],
    },
    Rule {
        entity: Sample,
        holder: HolderReq::Is(Manufacturer),
        actor: Manufacturer,
        action: RouteAction::Ship,
        guard: Guard::stage_in(&[Stage::InProduction]),
        next_holder: Admin,
        next_stage: Some(Stage::Shipped),
        lock: LockChange::Keep,
        notify: &[N(Admin)],
    },
    Rule {
        entity: Sample,
        holder: HolderReq::Is(Manufacturer),
        actor: Manufacturer,
        action: RouteAction::Route(Admin),
        guard: Guard::UNLOCKED,
        next_holder: Admin,
        next_stage: None,
        lock: LockChange::Keep,
        notify: &[N(Admin)],
    },
    Rule {
        entity: Sample,
        holder: HolderReq::Is(Client),
        actor: Client,
        action: RouteAction::Approve,
        guard: Guard::stage_in(&[Stage::SentToClient]),
        next_holder: Admin,
        next_stage: Some(Stage::Approved),
        lock: LockChange::Lock,
        notify: &[N(Admin), N(Manufacturer)],
    },
    Rule {
        entity: Sample,
        holder: HolderReq::Is(Client),
        actor: Client,
        action: RouteAction::RequestRevision,
        guard: Guard::stage_in(&[Stage::SentToClient]),
        next_holder: Admin,
        next_stage: Some(Stage::RevisionRequested),
        lock: LockChange::Keep,
        notify: &[N(Admin)],
    },
    Rule {
        entity: Sample,
        holder: HolderReq::NotAdmin,
        actor: Admin,
        action: RouteAction::Route(Admin),
        guard: Guard::UNLOCKED,
        next_holder: Admin,
        next_stage: None,
        lock: LockChange::Keep,
        notify: &[PreviousHolder],
    },
];

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("A {actor} cannot act on a {entity} currently routed to {holder}")]
    NotHolder {
        entity: RoutedEntity,
        holder: Role,
        actor: Role,
    },

    #[error("A {actor} cannot {action} a {entity} routed to {holder}")]
    NotAllowed {
        entity: RoutedEntity,
        holder: Role,
        actor: Role,
        action: RouteAction,
    },

    #[error("Cannot {action} this {entity}: {reason}")]
    Guard {
        entity: RoutedEntity,
        action: RouteAction,
        reason: String,
    },
}

impl From<RoutingError> for CoreError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::NotHolder { .. } => CoreError::Forbidden(err.to_string()),
            RoutingError::NotAllowed { .. } | RoutingError::Guard { .. } => {
                CoreError::Conflict(err.to_string())
            }
        }
    }
}

/// The outcome of a legal transition, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionPlan {
    pub entity: RoutedEntity,
    pub action: RouteAction,
    pub from: RoutingState,
    pub to: RoutingState,
    pub lock_change: LockChange,
    /// Roles to notify, deduplicated, in table order.
    pub notify: Vec<Role>,
}

impl TransitionPlan {
    /// Audit `action_type` for this transition, e.g. `product.route`.
    pub fn audit_action(&self) -> String {
        format!("{}.{}", self.entity, self.action.as_str())
    }

    /// Human-readable notification text for the item named `subject`.
    pub fn describe(&self, subject: &str) -> String {
        let entity = match self.entity {
            RoutedEntity::Product => "Product",
            RoutedEntity::Sample => "Sample",
        };
        match self.action {
            RouteAction::Route(role) => format!("{entity} \"{subject}\" was routed to {role}"),
            RouteAction::StartProduction => format!("{entity} \"{subject}\" is in production"),
            RouteAction::Ship => format!("{entity} \"{subject}\" has shipped"),
            RouteAction::Approve => format!("{entity} \"{subject}\" was approved"),
            RouteAction::RequestRevision => {
                format!("{entity} \"{subject}\" needs revision")
            }
            RouteAction::Complete => format!("{entity} \"{subject}\" is complete"),
            RouteAction::Reopen => format!("{entity} \"{subject}\" was reopened"),
        }
    }
}

fn matching_rules(
    entity: RoutedEntity,
    state: &RoutingState,
    actor: Role,
) -> impl Iterator<Item = &'static Rule> + '_ {
    RULES
        .iter()
        .filter(move |r| r.entity == entity && r.actor == actor && r.holder.matches(state.holder))
}

/// Plan the transition `action` taken by `actor` on an item in `state`.
pub fn plan_transition(
    entity: RoutedEntity,
    state: &RoutingState,
    actor: Role,
    action: RouteAction,
) -> Result<TransitionPlan, RoutingError> {
    let mut guard_failure: Option<String> = None;

    for rule in matching_rules(entity, state, actor).filter(|r| r.action == action) {
        match rule.guard.check(entity, state) {
            Ok(()) => return Ok(build_plan(rule, state)),
            Err(reason) => guard_failure = Some(reason),
        }
    }

    if let Some(reason) = guard_failure {
        return Err(RoutingError::Guard {
            entity,
            action,
            reason,
        });
    }

    if actor != state.holder && !actor.is_admin() {
        return Err(RoutingError::NotHolder {
            entity,
            holder: state.holder,
            actor,
        });
    }

    Err(RoutingError::NotAllowed {
        entity,
        holder: state.holder,
        actor,
        action,
    })
}

fn build_plan(rule: &Rule, state: &RoutingState) -> TransitionPlan {
    let locked = match rule.lock {
        LockChange::Keep => state.locked,
        LockChange::Lock => true,
        LockChange::Unlock => false,
    };

    let mut notify: Vec<Role> = Vec::with_capacity(rule.notify.len());
    for target in rule.notify {
        let role = match target {
            NotifyTarget::Holder(role) => *role,
            NotifyTarget::PreviousHolder => state.holder,
        };
        if !notify.contains(&role) {
            notify.push(role);
        }
    }

    TransitionPlan {
        entity: rule.entity,
        action: rule.action,
        from: *state,
        to: RoutingState {
            holder: rule.next_holder,
            stage: rule.next_stage.unwrap_or(state.stage),
            locked,
        },
        lock_change: rule.lock,
        notify,
    }
}

/// Every action `actor` may currently take on an item in `state`.
pub fn allowed_actions(entity: RoutedEntity, state: &RoutingState, actor: Role) -> Vec<RouteAction> {
    let mut actions: Vec<RouteAction> = Vec::new();
    for rule in matching_rules(entity, state, actor) {
        if rule.guard.check(entity, state).is_ok() && !actions.contains(&rule.action) {
            actions.push(rule.action);
        }
    }
    actions
}

/// Holders `actor` may currently route the item to.
pub fn allowed_destinations(entity: RoutedEntity, state: &RoutingState, actor: Role) -> Vec<Role> {
    allowed_actions(entity, state, actor)
        .into_iter()
        .filter_map(RouteAction::destination)
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn state(holder: Role, stage: Stage, locked: bool) -> RoutingState {
        RoutingState {
            holder,
            stage,
            locked,
        }
    }

    fn apply(
        entity: RoutedEntity,
        from: RoutingState,
        actor: Role,
        action: RouteAction,
    ) -> RoutingState {
        plan_transition(entity, &from, actor, action)
            .unwrap_or_else(|e| panic!("{action} by {actor} should be legal: {e}"))
            .to
    }

    // -----------------------------------------------------------------------
    // Table integrity
    // -----------------------------------------------------------------------

    #[test]
    fn rule_stages_belong_to_their_entity() {
        for rule in RULES {
            if let Some(stage) = rule.next_stage {
                assert!(
                    stage.applies_to(rule.entity),
                    "{stage} is not a {} stage",
                    rule.entity
                );
            }
        }
    }

    #[test]
    fn actors_only_act_on_items_they_hold_unless_admin() {
        for rule in RULES {
            if rule.actor != Role::Admin {
                assert_eq!(rule.holder, HolderReq::Is(rule.actor));
            }
        }
    }

    #[test]
    fn recall_rules_always_return_to_admin() {
        for rule in RULES.iter().filter(|r| r.holder == HolderReq::NotAdmin) {
            assert_eq!(rule.action, RouteAction::Route(Role::Admin));
            assert_eq!(rule.next_holder, Role::Admin);
            assert_eq!(rule.next_stage, None);
        }
    }

    #[test]
    fn no_rule_routes_to_the_current_holder() {
        for rule in RULES {
            if let (RouteAction::Route(dest), HolderReq::Is(holder)) = (rule.action, rule.holder) {
                assert_ne!(dest, holder);
            }
        }
    }

    #[test]
    fn stages_parse_from_their_names() {
        for stage in Stage::ALL {
            assert_eq!(Stage::parse(stage.as_str()).unwrap(), stage);
        }
        assert!(Stage::parse("lost").is_err());
    }

    // -----------------------------------------------------------------------
    // Product workflow
    // -----------------------------------------------------------------------

    #[test]
    fn product_full_happy_path() {
        let p = RoutedEntity::Product;
        let s = RoutingState::initial(p);
        assert_eq!(s, state(Role::Admin, Stage::Pending, false));

        let s = apply(p, s, Role::Admin, RouteAction::Route(Role::Manufacturer));
        assert_eq!(s, state(Role::Manufacturer, Stage::SentToManufacturer, false));

        let s = apply(p, s, Role::Manufacturer, RouteAction::Route(Role::Admin));
        assert_eq!(s, state(Role::Admin, Stage::ManufacturerReviewed, false));

        let s = apply(p, s, Role::Admin, RouteAction::Route(Role::Client));
        assert_eq!(s, state(Role::Client, Stage::SentToClient, false));

        let s = apply(p, s, Role::Client, RouteAction::Approve);
        assert_eq!(s, state(Role::Admin, Stage::ClientApproved, false));

        let s = apply(p, s, Role::Admin, RouteAction::Approve);
        assert_eq!(s, state(Role::Admin, Stage::Approved, true));

        let s = apply(p, s, Role::Admin, RouteAction::Route(Role::Manufacturer));
        assert_eq!(s, state(Role::Manufacturer, Stage::ReadyForProduction, true));

        let s = apply(p, s, Role::Manufacturer, RouteAction::StartProduction);
        assert_eq!(s, state(Role::Manufacturer, Stage::InProduction, true));

        let s = apply(p, s, Role::Manufacturer, RouteAction::Ship);
        assert_eq!(s, state(Role::Admin, Stage::Shipped, true));

        let s = apply(p, s, Role::Admin, RouteAction::Complete);
        assert_eq!(s, state(Role::Admin, Stage::Completed, true));
    }

    #[test]
    fn client_revision_returns_product_to_admin() {
        let s = state(Role::Client, Stage::SentToClient, false);
        let plan = plan_transition(
            RoutedEntity::Product,
            &s,
            Role::Client,
            RouteAction::RequestRevision,
        )
        .unwrap();
        assert_eq!(plan.to, state(Role::Admin, Stage::RevisionRequested, false));
        assert_eq!(plan.notify, vec![Role::Admin]);
        assert_eq!(plan.audit_action(), "product.request_revision");
    }

    #[test]
    fn approve_locks_product_and_notifies_client() {
        let s = state(Role::Admin, Stage::ClientApproved, false);
        let plan =
            plan_transition(RoutedEntity::Product, &s, Role::Admin, RouteAction::Approve).unwrap();
        assert_eq!(plan.lock_change, LockChange::Lock);
        assert!(plan.to.locked);
        assert_eq!(plan.notify, vec![Role::Client]);
    }

    #[test]
    fn ship_notifies_admin_and_client() {
        let s = state(Role::Manufacturer, Stage::InProduction, true);
        let plan =
            plan_transition(RoutedEntity::Product, &s, Role::Manufacturer, RouteAction::Ship)
                .unwrap();
        assert_eq!(plan.notify, vec![Role::Admin, Role::Client]);
        assert_eq!(plan.to.holder, Role::Admin);
    }

    #[test]
    fn admin_recall_notifies_previous_holder_and_keeps_stage() {
        let s = state(Role::Client, Stage::SentToClient, false);
        let plan = plan_transition(
            RoutedEntity::Product,
            &s,
            Role::Admin,
            RouteAction::Route(Role::Admin),
        )
        .unwrap();
        assert_eq!(plan.to, state(Role::Admin, Stage::SentToClient, false));
        assert_eq!(plan.notify, vec![Role::Client]);
    }

    #[test]
    fn recall_blocked_during_production() {
        let s = state(Role::Manufacturer, Stage::InProduction, true);
        let err = plan_transition(
            RoutedEntity::Product,
            &s,
            Role::Admin,
            RouteAction::Route(Role::Admin),
        )
        .unwrap_err();
        assert_matches!(err, RoutingError::Guard { .. });
    }

    #[test]
    fn reopen_unlocks_approved_product() {
        let s = state(Role::Admin, Stage::Approved, true);
        let plan =
            plan_transition(RoutedEntity::Product, &s, Role::Admin, RouteAction::Reopen).unwrap();
        assert_eq!(plan.to, state(Role::Admin, Stage::Pending, false));
        assert_eq!(plan.lock_change, LockChange::Unlock);
        assert!(plan.notify.is_empty());
    }

    #[test]
    fn reopen_rejected_after_shipping() {
        let s = state(Role::Admin, Stage::Shipped, true);
        let err = plan_transition(RoutedEntity::Product, &s, Role::Admin, RouteAction::Reopen)
            .unwrap_err();
        assert_matches!(err, RoutingError::Guard { .. });
    }

    #[test]
    fn locked_unapproved_product_cannot_go_to_manufacturer() {
        let s = state(Role::Admin, Stage::Shipped, true);
        let err = plan_transition(
            RoutedEntity::Product,
            &s,
            Role::Admin,
            RouteAction::Route(Role::Manufacturer),
        )
        .unwrap_err();
        assert_matches!(err, RoutingError::Guard { .. });
    }

    #[test]
    fn locked_product_cannot_go_to_client() {
        let s = state(Role::Admin, Stage::Approved, true);
        let err = plan_transition(
            RoutedEntity::Product,
            &s,
            Role::Admin,
            RouteAction::Route(Role::Client),
        )
        .unwrap_err();
        assert!(err.to_string().contains("locked"));
    }

    #[test]
    fn client_cannot_act_on_manufacturer_held_product() {
        let s = state(Role::Manufacturer, Stage::SentToManufacturer, false);
        let err = plan_transition(RoutedEntity::Product, &s, Role::Client, RouteAction::Approve)
            .unwrap_err();
        assert_matches!(err, RoutingError::NotHolder { .. });
        assert_matches!(CoreError::from(err), CoreError::Forbidden(_));
    }

    #[test]
    fn manufacturer_cannot_route_to_client() {
        let s = state(Role::Manufacturer, Stage::SentToManufacturer, false);
        let err = plan_transition(
            RoutedEntity::Product,
            &s,
            Role::Manufacturer,
            RouteAction::Route(Role::Client),
        )
        .unwrap_err();
        assert_matches!(err, RoutingError::NotAllowed { .. });
        assert_matches!(CoreError::from(err), CoreError::Conflict(_));
    }

    #[test]
    fn start_production_requires_ready_stage() {
        let s = state(Role::Manufacturer, Stage::SentToManufacturer, false);
        let err = plan_transition(
            RoutedEntity::Product,
            &s,
            Role::Manufacturer,
            RouteAction::StartProduction,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ready_for_production"));
    }

    // -----------------------------------------------------------------------
    // Sample workflow
    // -----------------------------------------------------------------------

    #[test]
    fn sample_happy_path_with_client_approval() {
        let e = RoutedEntity::Sample;
        let s = RoutingState::initial(e);
        assert_eq!(s.stage, Stage::Requested);

        let s = apply(e, s, Role::Admin, RouteAction::Route(Role::Manufacturer));
        let s = apply(e, s, Role::Manufacturer, RouteAction::StartProduction);
        let s = apply(e, s, Role::Manufacturer, RouteAction::Ship);
        assert_eq!(s, state(Role::Admin, Stage::Shipped, false));

        let s = apply(e, s, Role::Admin, RouteAction::Route(Role::Client));
        assert_eq!(s, state(Role::Client, Stage::SentToClient, false));

        let plan = plan_transition(e, &s, Role::Client, RouteAction::Approve).unwrap();
        assert_eq!(plan.to, state(Role::Admin, Stage::Approved, true));
        assert_eq!(plan.notify, vec![Role::Admin, Role::Manufacturer]);
    }

    #[test]
    fn admin_may_approve_shipped_sample_directly() {
        let s = state(Role::Admin, Stage::Shipped, false);
        let plan =
            plan_transition(RoutedEntity::Sample, &s, Role::Admin, RouteAction::Approve).unwrap();
        assert!(plan.to.locked);
        assert_eq!(plan.notify, vec![Role::Client, Role::Manufacturer]);
    }

    #[test]
    fn sample_cannot_go_to_client_before_shipping() {
        let s = RoutingState::initial(RoutedEntity::Sample);
        let err = plan_transition(
            RoutedEntity::Sample,
            &s,
            Role::Admin,
            RouteAction::Route(Role::Client),
        )
        .unwrap_err();
        assert_matches!(err, RoutingError::Guard { .. });
    }

    #[test]
    fn approved_sample_is_frozen_until_reopened() {
        let s = state(Role::Admin, Stage::Approved, true);
        assert_eq!(
            allowed_actions(RoutedEntity::Sample, &s, Role::Admin),
            vec![RouteAction::Reopen]
        );
        let reopened = apply(RoutedEntity::Sample, s, Role::Admin, RouteAction::Reopen);
        assert_eq!(reopened, state(Role::Admin, Stage::Requested, false));
    }

    #[test]
    fn sample_has_no_complete_action() {
        let s = state(Role::Admin, Stage::Shipped, false);
        let err = plan_transition(RoutedEntity::Sample, &s, Role::Admin, RouteAction::Complete)
            .unwrap_err();
        assert_matches!(err, RoutingError::NotAllowed { .. });
    }

    // -----------------------------------------------------------------------
    // Allowed actions / destinations
    // -----------------------------------------------------------------------

    #[test]
    fn pending_product_destinations_for_admin() {
        let s = RoutingState::initial(RoutedEntity::Product);
        assert_eq!(
            allowed_destinations(RoutedEntity::Product, &s, Role::Admin),
            vec![Role::Manufacturer, Role::Client]
        );
    }

    #[test]
    fn non_holders_get_no_actions() {
        let s = RoutingState::initial(RoutedEntity::Product);
        assert!(allowed_actions(RoutedEntity::Product, &s, Role::Client).is_empty());
        assert!(allowed_actions(RoutedEntity::Product, &s, Role::Manufacturer).is_empty());
    }

    #[test]
    fn every_allowed_action_plans_successfully() {
        for entity in [RoutedEntity::Product, RoutedEntity::Sample] {
            for holder in Role::ALL {
                for stage in Stage::ALL.into_iter().filter(|s| s.applies_to(entity)) {
                    for locked in [false, true] {
                        let s = state(holder, stage, locked);
                        for actor in Role::ALL {
                            for action in allowed_actions(entity, &s, actor) {
                                assert!(plan_transition(entity, &s, actor, action).is_ok());
                            }
                        }
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Wire form
    // -----------------------------------------------------------------------

    #[test]
    fn action_from_parts() {
        assert_eq!(
            RouteAction::from_parts("route", Some("client")).unwrap(),
            RouteAction::Route(Role::Client)
        );
        assert_eq!(
            RouteAction::from_parts("ship", None).unwrap(),
            RouteAction::Ship
        );
        assert!(RouteAction::from_parts("route", None).is_err());
        assert!(RouteAction::from_parts("ship", Some("admin")).is_err());
        assert!(RouteAction::from_parts("teleport", None).is_err());
    }

    #[test]
    fn action_serializes_with_destination() {
        let json = serde_json::to_value(RouteAction::Route(Role::Manufacturer)).unwrap();
        assert_eq!(json["action"], "route");
        assert_eq!(json["destination"], "manufacturer");
        let json = serde_json::to_value(RouteAction::Approve).unwrap();
        assert_eq!(json["action"], "approve");
    }

    #[test]
    fn describe_mentions_subject() {
        let s = RoutingState::initial(RoutedEntity::Product);
        let plan = plan_transition(
            RoutedEntity::Product,
            &s,
            Role::Admin,
            RouteAction::Route(Role::Manufacturer),
        )
        .unwrap();
        assert_eq!(
            plan.describe("Canvas tote"),
            "Product \"Canvas tote\" was routed to manufacturer"
        );
    }
}
