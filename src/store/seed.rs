//! Demo customer used to bootstrap a fresh store.

use crate::models::{Account, Loan, Movement, User, UserId};
use chrono::{NaiveDate, NaiveDateTime};

pub const DEMO_USER_ID: UserId = UserId(1490296660);
pub const DEMO_USER_NAME: &str = "Agustin";
pub const DEMO_ACCESS_CODE: &str = "1234";

pub struct DemoCustomer {
    pub user: User,
    pub accounts: Vec<Account>,
    /// Oldest first.
    pub movements: Vec<Movement>,
    pub loans: Vec<Loan>,
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(y, m, d).and_then(|date| date.and_hms_opt(h, min, 0))
}

pub fn demo_customer() -> DemoCustomer {
    let pesos = "Ahorro Pesos IceCash";
    let dollars = "Corriente Dólares IceCash";

    DemoCustomer {
        user: User {
            id: DEMO_USER_ID,
            display_name: DEMO_USER_NAME.to_string(),
            access_code: Some(DEMO_ACCESS_CODE.to_string()),
        },
        accounts: vec![
            Account {
                id: 1,
                name: pesos.to_string(),
                amount: 17000.0,
                currency: Some("UYU".to_string()),
            },
            Account {
                id: 2,
                name: dollars.to_string(),
                amount: 550.75,
                currency: Some("USD".to_string()),
            },
        ],
        movements: vec![
            Movement {
                account_name: pesos.to_string(),
                description: "Compra Supermercado".to_string(),
                amount: -1250.50,
                timestamp: at(2024, 6, 1, 10, 15),
            },
            Movement {
                account_name: pesos.to_string(),
                description: "Pago Factura Luz".to_string(),
                amount: -850.00,
                timestamp: at(2024, 6, 2, 18, 40),
            },
            Movement {
                account_name: pesos.to_string(),
                description: "Depósito Nómina".to_string(),
                amount: 25000.00,
                timestamp: at(2024, 6, 3, 9, 0),
            },
            Movement {
                account_name: pesos.to_string(),
                description: "Retiro Cajero".to_string(),
                amount: -2000.00,
                timestamp: at(2024, 6, 4, 21, 30),
            },
        ],
        loans: vec![
            Loan {
                name: "Préstamo Consumo Rápido".to_string(),
                total: 50000.0,
                paid: Some(10000.0),
                due_date: NaiveDate::from_ymd_opt(2024, 12, 31),
            },
            Loan {
                name: "Adelanto Vacaciones".to_string(),
                total: 20000.0,
                paid: Some(0.0),
                due_date: NaiveDate::from_ymd_opt(2024, 9, 30),
            },
        ],
    }
}
