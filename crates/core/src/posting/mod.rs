//! Document posting: turns sales, bills, receipts, payments and transfers
//! into balanced ledger transactions.

mod builders;
mod documents;
mod poster;

#[cfg(test)]
mod tests;

pub use builders::{BillLegs, CostLeg, PostingBuilder, SaleLegs};
pub use documents::{
    BillDocument, BillLine, DocumentHeader, PaymentDocument, ReceiptDocument, SaleDocument, SaleLine,
    Settlement, TransferDocument,
};
pub use poster::{DocumentPoster, PostedDocument, VoidedDocument};
