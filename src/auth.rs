//! Caller identity and the capability set consulted by every command and query.
//!
//! Authentication happens upstream; by the time a request reaches this service
//! the gateway has attached `x-caller-role` and `x-caller-id` headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const ROLE_HEADER: &str = "x-caller-role";
pub const ID_HEADER: &str = "x-caller-id";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    SuperUser,
    Client,
    Courier,
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "SUPER_USER" => Ok(Role::SuperUser),
            "CLIENT" => Ok(Role::Client),
            "COURIER" => Ok(Role::Courier),
            other => Err(AppError::PermissionDenied(format!("unknown role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewShipments,
    CreateShipment,
    /// Packaging and courier assignment.
    DispatchShipment,
    /// Transit, delivery outcome and return handling.
    UpdateDelivery,
    RequestReturn,
    EditFees,
    ManageClients,
    ManageCouriers,
    ViewLedger,
    RequestPayout,
    ProcessPayout,
    ViewReports,
    SubscribeEvents,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewShipments => "view_shipments",
            Action::CreateShipment => "create_shipment",
            Action::DispatchShipment => "dispatch_shipment",
            Action::UpdateDelivery => "update_delivery",
            Action::RequestReturn => "request_return",
            Action::EditFees => "edit_fees",
            Action::ManageClients => "manage_clients",
            Action::ManageCouriers => "manage_couriers",
            Action::ViewLedger => "view_ledger",
            Action::RequestPayout => "request_payout",
            Action::ProcessPayout => "process_payout",
            Action::ViewReports => "view_reports",
            Action::SubscribeEvents => "subscribe_events",
        }
    }
}

/// Authorization seam. The engine only ever asks these two questions.
pub trait Authorizer: Send + Sync {
    fn has_permission(&self, caller: &Caller, action: Action) -> bool;

    fn can_access_admin_financials(&self, caller: &Caller) -> bool;
}

/// Static role → capability table.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleCapabilities;

impl RoleCapabilities {
    fn capabilities(role: Role) -> &'static [Action] {
        use Action::*;

        match role {
            Role::Admin => &[
                ViewShipments,
                CreateShipment,
                DispatchShipment,
                UpdateDelivery,
                RequestReturn,
                EditFees,
                ManageClients,
                ManageCouriers,
                ViewLedger,
                ProcessPayout,
                ViewReports,
                SubscribeEvents,
            ],
            Role::SuperUser => &[
                ViewShipments,
                CreateShipment,
                DispatchShipment,
                UpdateDelivery,
                RequestReturn,
                ViewReports,
            ],
            Role::Client => &[ViewShipments, CreateShipment, RequestReturn],
            Role::Courier => &[ViewShipments, UpdateDelivery, ViewLedger, RequestPayout],
        }
    }
}

impl Authorizer for RoleCapabilities {
    fn has_permission(&self, caller: &Caller, action: Action) -> bool {
        Self::capabilities(caller.role).contains(&action)
    }

    fn can_access_admin_financials(&self, caller: &Caller) -> bool {
        caller.role == Role::Admin
    }
}

pub fn require(
    authorizer: &dyn Authorizer,
    caller: &Caller,
    action: Action,
) -> Result<(), AppError> {
    if authorizer.has_permission(caller, action) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(format!(
            "{:?} {} may not {}",
            caller.role,
            caller.id,
            action.as_str()
        )))
    }
}

pub fn require_admin_financials(
    authorizer: &dyn Authorizer,
    caller: &Caller,
) -> Result<(), AppError> {
    if authorizer.can_access_admin_financials(caller) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(format!(
            "{:?} {} may not access admin financials",
            caller.role, caller.id
        )))
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
                .ok_or_else(|| AppError::PermissionDenied(format!("missing {name} header")))
        };

        let role = header(ROLE_HEADER)?.parse::<Role>()?;
        let id = header(ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|err| AppError::PermissionDenied(format!("invalid {ID_HEADER}: {err}")))?;

        Ok(Caller { id, role })
    }
}
