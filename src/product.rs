// Product customization form
// Tracks the chosen options of one menu product and prices the result

use crate::api::{ApiError, BackendApi};
use crate::cart::LineItem;
use crate::config::AmountLimits;
use crate::models::{ProductRecord, SelectedParam};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProductError {
    #[error("Unknown parameter: {0}")]
    UnknownParam(String),

    #[error("Unknown option {option} for parameter {param}")]
    UnknownOption { param: String, option: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(u32),
}

// Fetch the menu and open a form for every product
pub async fn load_catalog(
    backend: &dyn BackendApi,
    limits: AmountLimits,
) -> Result<Vec<ProductForm>, ApiError> {
    let products = backend.fetch_products().await?;
    debug!("Loaded {} products", products.len());
    Ok(products
        .into_iter()
        .map(|product| ProductForm::new(product, limits))
        .collect())
}

#[derive(Debug, Clone)]
pub struct ProductForm {
    product: ProductRecord,
    limits: AmountLimits,
    // param id -> chosen option ids
    selections: BTreeMap<String, BTreeSet<String>>,
    amount: u32,
}

impl ProductForm {
    // New form with every default option chosen
    pub fn new(product: ProductRecord, limits: AmountLimits) -> Self {
        let selections = product
            .params
            .iter()
            .map(|(param_id, param)| {
                let defaults = param
                    .options
                    .iter()
                    .filter(|(_, option)| option.default)
                    .map(|(option_id, _)| option_id.clone())
                    .collect();
                (param_id.clone(), defaults)
            })
            .collect();

        Self {
            product,
            limits,
            selections,
            amount: limits.default,
        }
    }

    pub fn product(&self) -> &ProductRecord {
        &self.product
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn set_amount(&mut self, amount: u32) -> Result<(), ProductError> {
        if !self.limits.contains(amount) {
            return Err(ProductError::InvalidAmount(amount));
        }
        self.amount = amount;
        Ok(())
    }

    pub fn is_selected(&self, param_id: &str, option_id: &str) -> bool {
        self.selections
            .get(param_id)
            .map_or(false, |chosen| chosen.contains(option_id))
    }

    fn check_option(&self, param_id: &str, option_id: &str) -> Result<bool, ProductError> {
        let param = self
            .product
            .params
            .get(param_id)
            .ok_or_else(|| ProductError::UnknownParam(param_id.to_string()))?;
        if !param.options.contains_key(option_id) {
            return Err(ProductError::UnknownOption {
                param: param_id.to_string(),
                option: option_id.to_string(),
            });
        }
        Ok(param.kind.is_single_choice())
    }

    // Pick `option_id`; for radios and selects it replaces the previous choice.
    pub fn choose_option(&mut self, param_id: &str, option_id: &str) -> Result<(), ProductError> {
        let single = self.check_option(param_id, option_id)?;
        let chosen = self.selections.entry(param_id.to_string()).or_default();
        if single {
            chosen.clear();
        }
        chosen.insert(option_id.to_string());
        Ok(())
    }

    // Flip a checkbox. Single-choice params cannot be emptied, toggling picks the option.
    // Returns whether the option is selected afterwards.
    pub fn toggle_option(&mut self, param_id: &str, option_id: &str) -> Result<bool, ProductError> {
        if self.check_option(param_id, option_id)? {
            self.choose_option(param_id, option_id)?;
            return Ok(true);
        }

        let chosen = self.selections.entry(param_id.to_string()).or_default();
        if chosen.remove(option_id) {
            Ok(false)
        } else {
            chosen.insert(option_id.to_string());
            Ok(true)
        }
    }

    // Price of one unit.
    // Starts from the base price, adds every chosen option that is not part
    // of the default recipe and subtracts every default option left out.
    pub fn price_single(&self) -> f64 {
        let mut price = self.product.price;

        for (param_id, param) in &self.product.params {
            for (option_id, option) in &param.options {
                let selected = self.is_selected(param_id, option_id);
                if selected && !option.default {
                    price += option.price;
                } else if !selected && option.default {
                    price -= option.price;
                }
            }
        }

        price
    }

    pub fn price(&self) -> f64 {
        self.price_single() * self.amount as f64
    }

    // Labels of the chosen options, grouped by parameter
    pub fn selected_params(&self) -> BTreeMap<String, SelectedParam> {
        self.product
            .params
            .iter()
            .map(|(param_id, param)| {
                let options = param
                    .options
                    .iter()
                    .filter(|(option_id, _)| self.is_selected(param_id, option_id))
                    .map(|(option_id, option)| (option_id.clone(), option.label.clone()))
                    .collect();
                (
                    param_id.clone(),
                    SelectedParam {
                        label: param.label.clone(),
                        options,
                    },
                )
            })
            .collect()
    }

    // Image layers to show, keyed "{param}-{option}"
    pub fn visible_images(&self) -> Vec<String> {
        self.selections
            .iter()
            .flat_map(|(param_id, chosen)| {
                chosen
                    .iter()
                    .map(move |option_id| format!("{}-{}", param_id, option_id))
            })
            .collect()
    }

    pub fn line_item(&self) -> LineItem {
        LineItem {
            id: self.product.id.clone(),
            name: self.product.name.clone(),
            amount: self.amount,
            price_single: self.price_single(),
            params: self.selected_params(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_backend::MockBackend;
    use crate::cart::Cart;
    use crate::config::CartConfig;

    const PIZZA: &str = r#"{
        "id": "pizza",
        "name": "Nonna Alba's Pizza",
        "price": 20,
        "params": {
            "sauce": {
                "label": "Sauce",
                "type": "radios",
                "options": {
                    "tomato": {"label": "Tomato", "price": 0, "default": true},
                    "cream": {"label": "Sour cream", "price": 2}
                }
            },
            "toppings": {
                "label": "Toppings",
                "type": "checkboxes",
                "options": {
                    "olives": {"label": "Olives", "price": 2, "default": true},
                    "redPeppers": {"label": "Red peppers", "price": 2, "default": true},
                    "salami": {"label": "Salami", "price": 3}
                }
            },
            "crust": {
                "label": "Pizza crust",
                "type": "select",
                "options": {
                    "standard": {"label": "Standard", "price": 0, "default": true},
                    "thin": {"label": "Thin", "price": 0}
                }
            }
        }
    }"#;

    fn pizza_form() -> ProductForm {
        let product: ProductRecord = serde_json::from_str(PIZZA).unwrap();
        ProductForm::new(product, AmountLimits::default())
    }

    #[test]
    fn test_defaults_keep_base_price() {
        let form = pizza_form();
        assert!(form.is_selected("sauce", "tomato"));
        assert!(form.is_selected("toppings", "olives"));
        assert!(!form.is_selected("toppings", "salami"));
        assert_eq!(form.price_single(), 20.0);
        assert_eq!(form.amount(), 1);
    }

    #[test]
    fn test_option_deltas() {
        let mut form = pizza_form();

        assert!(!form.toggle_option("toppings", "olives").unwrap());
        assert_eq!(form.price_single(), 18.0);

        assert!(form.toggle_option("toppings", "salami").unwrap());
        assert_eq!(form.price_single(), 21.0);

        form.choose_option("sauce", "cream").unwrap();
        assert!(!form.is_selected("sauce", "tomato"));
        assert_eq!(form.price_single(), 23.0);

        form.set_amount(2).unwrap();
        assert_eq!(form.price(), 46.0);
    }

    #[test]
    fn test_single_choice_cannot_be_emptied() {
        let mut form = pizza_form();
        assert!(form.toggle_option("crust", "standard").unwrap());
        assert!(form.is_selected("crust", "standard"));

        assert!(form.toggle_option("crust", "thin").unwrap());
        assert!(form.is_selected("crust", "thin"));
        assert!(!form.is_selected("crust", "standard"));
        assert_eq!(form.price_single(), 20.0);
    }

    #[test]
    fn test_unknown_params_and_amounts() {
        let mut form = pizza_form();
        assert_eq!(
            form.toggle_option("cheese", "extra"),
            Err(ProductError::UnknownParam("cheese".to_string()))
        );
        assert!(matches!(
            form.choose_option("sauce", "pesto"),
            Err(ProductError::UnknownOption { .. })
        ));
        assert_eq!(form.set_amount(0), Err(ProductError::InvalidAmount(0)));
        assert_eq!(form.amount(), 1);
    }

    #[test]
    fn test_selected_params_and_images() {
        let mut form = pizza_form();
        form.toggle_option("toppings", "redPeppers").unwrap();

        let params = form.selected_params();
        assert_eq!(params["toppings"].label, "Toppings");
        assert_eq!(
            params["toppings"].options.keys().collect::<Vec<_>>(),
            vec!["olives"]
        );
        assert_eq!(params["sauce"].options["tomato"], "Tomato");

        let images = form.visible_images();
        assert!(images.contains(&"toppings-olives".to_string()));
        assert!(images.contains(&"crust-standard".to_string()));
        assert!(!images.contains(&"toppings-redPeppers".to_string()));
    }

    #[test]
    fn test_line_item_goes_into_cart() {
        let mut form = pizza_form();
        form.toggle_option("toppings", "salami").unwrap();
        form.set_amount(3).unwrap();

        let mut cart = Cart::new(CartConfig::default());
        let line_id = cart.add(form.line_item()).unwrap();

        let line = cart.line(line_id).unwrap();
        assert_eq!(line.price_single, 23.0);
        assert_eq!(line.price, 69.0);
        assert_eq!(line.amount, 3);
        assert!(line.params["toppings"].options.contains_key("salami"));
    }

    #[tokio::test]
    async fn test_load_catalog() {
        let product: ProductRecord = serde_json::from_str(PIZZA).unwrap();
        let backend = MockBackend::new().with_products(vec![product]);

        let forms = load_catalog(&backend, AmountLimits::default()).await.unwrap();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].product().name, "Nonna Alba's Pizza");
        assert_eq!(forms[0].price(), 20.0);
    }
}
