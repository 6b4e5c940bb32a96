// Wire records exchanged with the restaurant backend
use crate::availability::{RecurringEvent, Reservation};
use crate::hours::HourSlot;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// Identifier of a bookable table.
// The backend sends integers, markup attributes arrive as strings. Numeric
// strings go through `TableId::parse` so both sides compare equal; the
// comparison itself is strict.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableId {
    Number(u32),
    Name(String),
}

impl TableId {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u32>() {
            Ok(number) => TableId::Number(number),
            Err(_) => TableId::Name(trimmed.to_string()),
        }
    }
}

impl From<u32> for TableId {
    fn from(value: u32) -> Self {
        TableId::Number(value)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableId::Number(n) => write!(f, "{}", n),
            TableId::Name(name) => f.write_str(name),
        }
    }
}

// Recurrence rule of an event. The backend sends `false` for one-off events
// and a kind string ("daily") for repeating ones.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Other(String),
}

impl Recurrence {
    pub fn is_repeating(&self) -> bool {
        !matches!(self, Recurrence::None)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecurrence {
    Flag(bool),
    Kind(String),
}

impl<'de> Deserialize<'de> for Recurrence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<RawRecurrence>::deserialize(deserializer)?;
        Ok(match raw {
            None | Some(RawRecurrence::Flag(false)) => Recurrence::None,
            Some(RawRecurrence::Flag(true)) => Recurrence::Other("true".to_string()),
            Some(RawRecurrence::Kind(kind)) => match kind.as_str() {
                "daily" => Recurrence::Daily,
                "" | "false" => Recurrence::None,
                _ => Recurrence::Other(kind),
            },
        })
    }
}

impl Serialize for Recurrence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Recurrence::None => serializer.serialize_bool(false),
            Recurrence::Daily => serializer.serialize_str("daily"),
            Recurrence::Other(kind) => serializer.serialize_str(kind),
        }
    }
}

// GET /booking item, also the echo returned by POST /booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub date: NaiveDate,
    pub hour: HourSlot,
    pub duration: f64,
    pub table: TableId,
}

impl BookingRecord {
    pub fn reservation(&self) -> Reservation {
        Reservation {
            date: self.date,
            start: self.hour,
            duration: self.duration,
            table: self.table.clone(),
        }
    }
}

// GET /events item; one-off events carry a date, repeating ones a recurrence kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub hour: HourSlot,
    pub duration: f64,
    pub table: TableId,
    #[serde(default)]
    pub repeat: Recurrence,
}

impl EventRecord {
    // Single-day reservation; None when the event has no date to pin it to
    pub fn reservation(&self) -> Option<Reservation> {
        self.date.map(|date| Reservation {
            date,
            start: self.hour,
            duration: self.duration,
            table: self.table.clone(),
        })
    }

    pub fn recurring(&self) -> RecurringEvent {
        RecurringEvent {
            start: self.hour,
            duration: self.duration,
            table: self.table.clone(),
            recurrence: self.repeat.clone(),
        }
    }
}

// POST /booking body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingPayload {
    pub date: NaiveDate,
    pub hour: HourSlot,
    pub table: TableId,
    pub duration: f64,
    pub ppl: u32,
    pub starters: Vec<String>,
    pub phone: String,
    pub address: String,
}

// Selected options of one product parameter, as sent with an order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectedParam {
    pub label: String,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProduct {
    pub id: String,
    pub amount: u32,
    pub price: f64,
    pub price_single: f64,
    pub name: String,
    pub params: BTreeMap<String, SelectedParam>,
}

// POST /orders body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub address: String,
    pub phone: String,
    pub total_price: f64,
    pub subtotal_price: f64,
    pub total_number: u32,
    pub delivery_fee: f64,
    pub products: Vec<OrderProduct>,
}

// Catalog data from GET /products

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Checkboxes,
    Radios,
    Select,
}

impl ParamKind {
    // Radios and selects hold exactly one choice
    pub fn is_single_choice(self) -> bool {
        matches!(self, ParamKind::Radios | ParamKind::Select)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRecord {
    pub label: String,
    pub price: f64,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamRecord {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub options: BTreeMap<String, OptionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("3", TableId::Number(3); "numeric attribute")]
    #[test_case(" 12 ", TableId::Number(12); "padded numeric attribute")]
    #[test_case("terrace", TableId::Name("terrace".to_string()); "named table")]
    fn test_table_id_parse(raw: &str, expected: TableId) {
        assert_eq!(TableId::parse(raw), expected);
    }

    #[test]
    fn test_table_id_equality_is_strict() {
        assert_ne!(TableId::Number(3), TableId::Name("3".to_string()));
    }

    #[test_case("false", Recurrence::None)]
    #[test_case("null", Recurrence::None)]
    #[test_case("\"daily\"", Recurrence::Daily)]
    #[test_case("\"weekly\"", Recurrence::Other("weekly".to_string()))]
    fn test_recurrence_from_wire(json: &str, expected: Recurrence) {
        let parsed: Recurrence = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_parse_booking_list() {
        let json = r#"[
            {"id": 1, "date": "2024-03-10", "hour": "12:00", "duration": 1, "table": 3},
            {"date": "2024-03-11", "hour": "16:30", "duration": 2.5, "table": "bar",
             "ppl": 2, "starters": ["water"], "phone": "123456789", "address": "Main St 1"}
        ]"#;

        let bookings: Vec<BookingRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[0].id, Some(1));
        assert_eq!(bookings[0].table, TableId::Number(3));
        assert_eq!(bookings[1].hour.as_hours(), 16.5);
        assert_eq!(bookings[1].table, TableId::Name("bar".to_string()));
    }

    #[test]
    fn test_parse_events_with_and_without_dates() {
        let json = r#"[
            {"id": 1, "date": "2024-01-02", "hour": "18:00", "duration": 2, "table": 5, "repeat": false},
            {"id": 2, "date": "2024-01-01", "hour": "12:00", "duration": 4, "table": 1, "repeat": "daily"},
            {"hour": "10:00", "duration": 1, "table": 2}
        ]"#;

        let events: Vec<EventRecord> = serde_json::from_str(json).unwrap();
        assert!(events[0].reservation().is_some());
        assert!(!events[0].repeat.is_repeating());
        assert_eq!(events[1].recurring().recurrence, Recurrence::Daily);
        assert!(events[2].reservation().is_none());
        assert_eq!(events[2].repeat, Recurrence::None);
    }

    #[test]
    fn test_order_payload_uses_camel_case() {
        let payload = OrderPayload {
            address: "Main St 1".to_string(),
            phone: "123456789".to_string(),
            total_price: 35.0,
            subtotal_price: 25.0,
            total_number: 3,
            delivery_fee: 10.0,
            products: vec![OrderProduct {
                id: "cake".to_string(),
                amount: 2,
                price: 20.0,
                price_single: 10.0,
                name: "Zio Stefano's Doughnut".to_string(),
                params: BTreeMap::new(),
            }],
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["totalPrice"], 35.0);
        assert_eq!(value["subtotalPrice"], 25.0);
        assert_eq!(value["totalNumber"], 3);
        assert_eq!(value["deliveryFee"], 10.0);
        assert_eq!(value["products"][0]["priceSingle"], 10.0);
    }

    #[test]
    fn test_booking_payload_wire_shape() {
        let payload = BookingPayload {
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            hour: HourSlot::parse("13:30").unwrap(),
            table: TableId::Number(2),
            duration: 1.5,
            ppl: 4,
            starters: vec!["bread".to_string()],
            phone: "123456789".to_string(),
            address: "Main St 1".to_string(),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["date"], "2024-03-10");
        assert_eq!(value["hour"], "13:30");
        assert_eq!(value["table"], 2);
        assert_eq!(value["starters"][0], "bread");
    }

    #[test]
    fn test_parse_product_catalog() {
        let json = r#"{
            "id": "pizza",
            "name": "Nonna Alba's Pizza",
            "price": 20,
            "description": "Homemade",
            "params": {
                "sauce": {
                    "label": "Sauce",
                    "type": "radios",
                    "options": {
                        "tomato": {"label": "Tomato", "price": 0, "default": true},
                        "cream": {"label": "Sour cream", "price": 2}
                    }
                }
            }
        }"#;

        let product: ProductRecord = serde_json::from_str(json).unwrap();
        let sauce = &product.params["sauce"];
        assert_eq!(sauce.kind, ParamKind::Radios);
        assert!(sauce.kind.is_single_choice());
        assert!(sauce.options["tomato"].default);
        assert!(!sauce.options["cream"].default);
    }
}
