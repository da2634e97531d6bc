//! Records submitted to the registry.
//!
//! These are plain values. The gateway never looks inside them: it only
//! serializes whatever it is given.

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

/// Document type for introducing goods into circulation.
pub const LP_INTRODUCE_GOODS: &str = "LP_INTRODUCE_GOODS";

/// One registry submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub description: Description,
    pub doc_id: String,
    pub doc_status: String,
    pub doc_type: String,
    pub import_request: bool,
    pub owner_inn: String,
    pub participant_inn: String,
    pub producer_inn: String,
    pub production_date: NaiveDate,
    pub production_type: String,
    pub products: Vec<Product>,
    pub reg_date: NaiveDate,
    pub reg_number: String,
}

/// A product entry inside a [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub certificate_document: String,
    pub certificate_document_date: NaiveDate,
    pub certificate_document_number: String,
    pub owner_inn: String,
    pub producer_inn: String,
    pub production_date: NaiveDate,
    pub tnved_code: String,
    pub uit_code: String,
    pub uitu_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    pub participant_inn: String,
}

impl Document {
    /// A placeholder goods-introduction document with a single product.
    ///
    /// Every text field holds `"string"`, which is what the registry's own API
    /// reference uses for examples.
    pub fn sample() -> Self {
        let date = NaiveDate::from_ymd_opt(2020, 1, 23).unwrap_or(NaiveDate::MIN);
        let placeholder = || "string".to_string();

        Self {
            description: Description {
                participant_inn: placeholder(),
            },
            doc_id: placeholder(),
            doc_status: placeholder(),
            doc_type: LP_INTRODUCE_GOODS.to_string(),
            import_request: true,
            owner_inn: placeholder(),
            participant_inn: placeholder(),
            producer_inn: placeholder(),
            production_date: date,
            production_type: placeholder(),
            products: vec![Product {
                certificate_document: placeholder(),
                certificate_document_date: date,
                certificate_document_number: placeholder(),
                owner_inn: placeholder(),
                producer_inn: placeholder(),
                production_date: date,
                tnved_code: placeholder(),
                uit_code: placeholder(),
                uitu_code: placeholder(),
            }],
            reg_date: date,
            reg_number: placeholder(),
        }
    }
}
