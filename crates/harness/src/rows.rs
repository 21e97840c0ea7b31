//! Terse row builders for tests. Everything starts live; chain
//! `deleted_at` to tombstone.

use ledgermerge_core::{ids::*, records::*};

pub fn account(id: &str, title: &str, initial_amount_cents: i64, created_on: i64) -> Account {
    Account {
        id: AccountId::new(id),
        title: title.into(),
        initial_amount_cents,
        is_included_in_total_balance: true,
        created_on,
        deleted_on: None,
        currency_id: None,
        icon: None,
        hash_code: None,
    }
}

pub fn category(id: &str, title: &str, category_type: CategoryType) -> Category {
    Category {
        id: CategoryId::new(id),
        title: title.into(),
        category_type,
        deleted_on: None,
    }
}

pub fn transaction(id: &str, account: &str, category: &str, amount_cents: i64, created_on: i64) -> Transaction {
    Transaction {
        id: TransactionId::new(id),
        account_id: AccountId::new(account),
        category_id: CategoryId::new(category),
        amount_cents,
        created_on,
        note: None,
        deleted_on: None,
    }
}

pub fn transfer(id: &str, from: &str, to: &str, amount_cents: i64, created_on: i64) -> Transfer {
    Transfer {
        id: TransferId::new(id),
        account_from_id: AccountId::new(from),
        account_to_id: AccountId::new(to),
        amount_cents,
        created_on,
        note: None,
        deleted_on: None,
    }
}

pub trait Tombstone: Sized {
    fn deleted_at(self, at: i64) -> Self;
}

macro_rules! impl_tombstone {
    ($($ty:ty),*) => {
        $(impl Tombstone for $ty {
            fn deleted_at(mut self, at: i64) -> Self {
                self.deleted_on = Some(at);
                self
            }
        })*
    };
}

impl_tombstone!(Account, Category, Transaction, Transfer);
