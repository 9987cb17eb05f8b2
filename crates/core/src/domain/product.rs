use std::collections::BTreeMap;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Product identifier, always held in string form.
///
/// Catalogs may carry integer ids; they deserialize to their decimal string so lookups
/// and persisted history compare ids uniformly.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ProductIdVisitor)
    }
}

struct ProductIdVisitor;

impl Visitor<'_> for ProductIdVisitor {
    type Value = ProductId;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a string or integer product id")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(ProductId::from(value))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(ProductId(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(ProductId(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(ProductId(value.to_string()))
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Catalog record as supplied by the catalog collaborator.
///
/// The engine never mutates these. Fields outside the well-known set are kept in
/// `attributes` so search filters can match against arbitrary product fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    pub category: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, alias = "reviewCount", skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
    #[serde(flatten, default)]
    pub attributes: BTreeMap<String, Value>,
}

impl ProductRef {
    pub fn new(id: impl Into<String>, category: impl Into<String>, price: f64) -> Self {
        Self {
            id: ProductId(id.into()),
            name: String::new(),
            category: category.into(),
            price,
            rating: None,
            review_count: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_rating(mut self, rating: f64, review_count: u32) -> Self {
        self.rating = Some(rating);
        self.review_count = Some(review_count);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Looks up a field by its wire name. Returns `None` when the product has no such field.
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "id" => Some(Value::String(self.id.0.clone())),
            "name" => (!self.name.is_empty()).then(|| Value::String(self.name.clone())),
            "category" => Some(Value::String(self.category.clone())),
            "price" => Number::from_f64(self.price).map(Value::Number),
            "rating" => self.rating.and_then(Number::from_f64).map(Value::Number),
            "review_count" | "reviewCount" => self.review_count.map(Value::from),
            other => self.attributes.get(other).cloned(),
        }
    }

    /// True when `price` lies within `band` (a fraction) of this product's price.
    pub fn within_price_band(&self, price: f64, band: f64) -> bool {
        (price - self.price).abs() <= band * self.price
    }
}

/// Identity comparison for filter values.
///
/// Numbers compare by value regardless of integer/float representation. Arrays and
/// objects never compare equal since filter values and product fields are distinct
/// instances. Null equals null.
pub fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        (Value::Array(_), _) | (Value::Object(_), _) => false,
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{strict_equals, ProductId, ProductRef};

    #[test]
    fn field_lookup_covers_known_and_extra_fields() {
        let product = ProductRef::new("p-1", "audio", 120.0)
            .with_name("Headphones")
            .with_rating(4.5, 12)
            .with_attribute("brand", "Acme");

        assert_eq!(product.field("category"), Some(json!("audio")));
        assert_eq!(product.field("reviewCount"), Some(json!(12)));
        assert_eq!(product.field("brand"), Some(json!("Acme")));
        assert_eq!(product.field("color"), None);
    }

    #[test]
    fn unnamed_product_has_no_name_field() {
        let product = ProductRef::new("p-1", "audio", 120.0);

        assert_eq!(product.field("name"), None);
        assert_eq!(product.with_name("Speaker").field("name"), Some(json!("Speaker")));
    }

    #[test]
    fn integer_ids_deserialize_to_their_string_form() {
        let product: ProductRef =
            serde_json::from_value(json!({"id": 7, "category": "A", "price": 100}))
                .expect("product should deserialize");
        assert_eq!(product.id, ProductId::new("7"));
        assert_eq!(serde_json::to_value(&product.id).expect("serialize"), json!("7"));

        let error = serde_json::from_value::<ProductId>(json!(1.5)).expect_err("float id");
        assert!(error.to_string().contains("string or integer"));
    }

    #[test]
    fn catalog_json_keeps_unknown_fields_as_attributes() {
        let product: ProductRef = serde_json::from_value(json!({
            "id": "p-2",
            "category": "audio",
            "price": 80,
            "reviewCount": 3,
            "brand": "Acme"
        }))
        .expect("product should deserialize");

        assert_eq!(product.review_count, Some(3));
        assert_eq!(product.attributes.get("brand"), Some(&json!("Acme")));
        assert!(product.name.is_empty());
    }

    #[test]
    fn strict_equality_matches_numbers_by_value_only() {
        assert!(strict_equals(&json!(100), &json!(100.0)));
        assert!(strict_equals(&json!("audio"), &json!("audio")));
        assert!(!strict_equals(&json!("100"), &json!(100)));
        assert!(!strict_equals(&json!(["a"]), &json!(["a"])));
        assert!(strict_equals(&json!(null), &json!(null)));
    }

    #[test]
    fn price_band_is_inclusive() {
        let product = ProductRef::new("p-1", "audio", 100.0);

        assert!(product.within_price_band(120.0, 0.2));
        assert!(product.within_price_band(80.0, 0.2));
        assert!(!product.within_price_band(120.5, 0.2));
    }
}
