pub mod mass_balance;
