//! Human-readable summaries sent back to the customer.
//!
//! Amounts use two decimals with an optional currency suffix; dates are
//! rendered day/month/year.

use crate::models::{Account, Loan, Movement};

const DATE_FORMAT: &str = "%d/%m/%Y";
const DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// `$1234.50` or `$1234.50 UYU`
pub fn amount(value: f64, currency: Option<&str>) -> String {
    match currency.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => format!("${:.2} {}", value, code),
        None => format!("${:.2}", value),
    }
}

pub fn accounts_summary(accounts: &[Account], recent_movements: &[Movement]) -> String {
    let mut lines = Vec::with_capacity(accounts.len() + recent_movements.len() + 2);

    if accounts.is_empty() {
        lines.push("No tienes cuentas registradas actualmente.".to_string());
    } else {
        lines.push("Estado de tus cuentas:".to_string());
        for account in accounts {
            lines.push(format!(
                "- {}: {}",
                account.name,
                amount(account.amount, account.currency.as_deref())
            ));
        }
    }

    if recent_movements.is_empty() {
        lines.push("\nNo tienes movimientos recientes.".to_string());
    } else {
        lines.push("\nTus últimos movimientos:".to_string());
        for movement in recent_movements {
            let when = movement
                .timestamp
                .map(|ts| format!(" ({})", ts.format(DATETIME_FORMAT)))
                .unwrap_or_default();
            lines.push(format!(
                "- [{}] {}: {}{}",
                movement.account_name,
                movement.description,
                amount(movement.amount, None),
                when
            ));
        }
    }

    lines.join("\n")
}

pub fn loans_summary(loans: &[Loan]) -> String {
    if loans.is_empty() {
        return "No tienes préstamos activos actualmente.".to_string();
    }

    let mut lines = Vec::with_capacity(loans.len() + 2);
    lines.push("Tus préstamos activos:".to_string());

    for loan in loans {
        let due = loan
            .due_date
            .map(|d| format!(". Vence: {}", d.format(DATE_FORMAT)))
            .unwrap_or_default();
        lines.push(format!(
            "- {}: Total {}, Pagado {}, Pendiente {}{}",
            loan.name,
            amount(loan.total, None),
            amount(loan.paid_amount(), None),
            amount(loan.pending(), None),
            due
        ));
    }

    let total: f64 = loans.iter().map(|l| l.total).sum();
    let paid: f64 = loans.iter().map(Loan::paid_amount).sum();
    lines.push(format!(
        "\nResumen: Total {}, Pagado {}, Pendiente {}",
        amount(total, None),
        amount(paid, None),
        amount(total - paid, None)
    ));

    lines.join("\n")
}
