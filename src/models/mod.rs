pub mod company;
pub mod product;
pub mod production;
pub mod stock;

// Re-export only the types we actually use
pub use company::Company;
pub use product::{Lot, Product, Uom};
pub use production::{Bom, BomLine, MassBalance, ProductionOrder, PRICE_DECIMALS};
pub use stock::{Location, MoveDirection, StockMove};
