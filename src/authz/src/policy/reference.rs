//! Compiled-in reference policy of the franchise rental application

use crate::hierarchy::{Role, RoleDefinition, ScopeLevel};
use crate::permissions::{ConstraintKey, Permission, PermissionCatalog};

use ConstraintKey::*;
use Permission::*;

/// Role table: levels, scopes and the operational inheritance chain
pub fn role_definitions() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new(Role::Operator, 1, ScopeLevel::Location),
        RoleDefinition::new(Role::Technician, 2, ScopeLevel::Location).inherits(Role::Operator),
        RoleDefinition::new(Role::Boltvezeto, 3, ScopeLevel::Location).inherits(Role::Technician),
        RoleDefinition::new(Role::Accountant, 3, ScopeLevel::Tenant),
        RoleDefinition::new(Role::PartnerOwner, 4, ScopeLevel::Tenant).inherits(Role::Boltvezeto),
        RoleDefinition::new(Role::CentralAdmin, 5, ScopeLevel::Global).inherits(Role::PartnerOwner),
        RoleDefinition::new(Role::DevopsAdmin, 6, ScopeLevel::Global).inherits(Role::CentralAdmin),
        RoleDefinition::new(Role::SuperAdmin, 7, ScopeLevel::Global).inherits(Role::DevopsAdmin),
    ]
}

/// Direct permissions and constraint values per role
pub fn catalog() -> PermissionCatalog {
    PermissionCatalog::new()
        .grant(
            Role::Operator,
            &[
                RentalView,
                RentalCreate,
                RentalReturn,
                RentalExtend,
                InventoryView,
                CustomerView,
                CustomerCreate,
                CustomerUpdate,
                ServiceView,
                InvoiceView,
                LocationView,
            ],
        )
        .constrain(Role::Operator, RentalExtend, ExtensionDays, 7.0)
        .grant(Role::Technician, &[ServiceCreate, ServiceClose, InventoryUpdate])
        .grant(
            Role::Boltvezeto,
            &[
                RentalCancel,
                RentalDiscount,
                InventoryTransfer,
                InventoryWriteOff,
                InvoiceCreate,
                InvoiceVoid,
                FinanceRefund,
                ReportView,
                UserView,
                UserCreate,
                UserUpdate,
                UserAssignRole,
            ],
        )
        .constrain(Role::Boltvezeto, RentalDiscount, DiscountLimit, 20.0)
        .constrain(Role::Boltvezeto, FinanceRefund, RefundLimit, 50_000.0)
        .constrain(Role::Boltvezeto, RentalExtend, ExtensionDays, 30.0)
        .constrain(Role::Boltvezeto, InventoryWriteOff, WriteOffValue, 100_000.0)
        .grant(
            Role::Accountant,
            &[
                RentalView,
                CustomerView,
                InvoiceView,
                InvoiceCreate,
                InvoiceVoid,
                FinanceRefund,
                FinanceReport,
                ReportView,
                ReportExport,
                LocationView,
                TenantView,
            ],
        )
        .constrain(Role::Accountant, FinanceRefund, RefundLimit, 200_000.0)
        .grant(
            Role::PartnerOwner,
            &[
                CustomerDelete,
                FinanceReport,
                ReportExport,
                UserDelete,
                LocationManage,
                TenantView,
                AuditView,
            ],
        )
        .constrain(Role::PartnerOwner, RentalDiscount, DiscountLimit, 100.0)
        .constrain(Role::PartnerOwner, FinanceRefund, RefundLimit, 1_000_000.0)
        .constrain(Role::PartnerOwner, RentalExtend, ExtensionDays, 90.0)
        .constrain(Role::PartnerOwner, InventoryWriteOff, WriteOffValue, 1_000_000.0)
        .grant(Role::CentralAdmin, &[TenantManage, AuditExport])
        .grant(Role::DevopsAdmin, &[SystemMaintenance])
        .grant(Role::SuperAdmin, &[SystemConfigure])
}
