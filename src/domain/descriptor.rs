use serde::Serialize;

/// Static registration metadata handed to the host once, when the component is loaded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub component_key: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub summary: &'static str,
    pub method: &'static str,
    pub tags: Vec<&'static str>,
    pub source: SourceInfo,
    pub inputs: Vec<FieldSpec>,
    pub outputs: Vec<FieldSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub summary: &'static str,
    pub links: Vec<SourceLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceLink {
    pub label: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Control {
    #[serde(rename = "AlpineTextComponent")]
    Text,
    #[serde(rename = "AlpineNumWithSliderComponent")]
    NumberSlider,
    #[serde(rename = "AlpineLabelComponent")]
    Label,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: &'static str,
    pub title: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(rename = "x-type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    pub description: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<Control>,
}

impl FieldSpec {
    fn new(name: &'static str, title: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            title,
            field_type,
            content_type: None,
            description: "",
            required: false,
            default: None,
            minimum: None,
            maximum: None,
            step: None,
            control: None,
        }
    }

    fn text(name: &'static str, title: &'static str, description: &'static str) -> Self {
        Self {
            content_type: Some(ContentType::Text),
            description,
            control: Some(Control::Text),
            ..Self::new(name, title, FieldType::String)
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }
}

impl ComponentDescriptor {
    pub fn generate_invoice() -> Self {
        let inputs = vec![
            FieldSpec::text("title", "Title", "Title").with_default("Invoice".into()),
            FieldSpec::text("from", "From", "The issuer of the invoice.").required(),
            FieldSpec::text("to", "To", "The receiver of the invoice.").required(),
            FieldSpec::text("note", "Note", "A note for the invoice."),
            FieldSpec {
                description: "The tax rate for the invoice.",
                required: true,
                default: Some(0.into()),
                minimum: Some(0.0),
                maximum: Some(1.0),
                step: Some(0.01),
                control: Some(Control::NumberSlider),
                ..FieldSpec::new("tax", "Tax", FieldType::Number)
            },
            FieldSpec::text(
                "id",
                "Number",
                "The invoice number (defaults to the current date).",
            ),
            FieldSpec::text("currency", "Currency", "The currency for the invoice.")
                .with_default("USD".into()),
            FieldSpec {
                content_type: Some(ContentType::Image),
                description: "The logo for the invoice.",
                control: Some(Control::Label),
                ..FieldSpec::new("logo", "Logo", FieldType::Object)
            },
            FieldSpec {
                description: "The due date for the invoice (defaults to the current date + 1 month).",
                ..FieldSpec::new("due", "Due Date", FieldType::String)
            },
            FieldSpec::text(
                "items",
                "Items",
                "The items for the invoice in the following format - quantity x item [$ rate], e.g., 10x Rubber Duck [$ 25]. If no quantity is mentioned, 1 is assumed.",
            )
            .required(),
        ];

        let outputs = vec![
            FieldSpec {
                description: "The JSON object for the invoice.",
                required: true,
                ..FieldSpec::new("json", "JSON", FieldType::Object)
            },
            FieldSpec {
                content_type: Some(ContentType::Document),
                description: "The PDF document for the invoice.",
                required: true,
                ..FieldSpec::new("pdf", "PDF", FieldType::Object)
            },
            FieldSpec {
                description: "The sum of all items and tax in the invoice",
                ..FieldSpec::new("total", "Invoice Total", FieldType::Number)
            },
            FieldSpec {
                description: "The tax on the invoice",
                ..FieldSpec::new("taxTotal", "Tax Total", FieldType::Number)
            },
            FieldSpec {
                description: "The sum of all items in the invoice",
                ..FieldSpec::new("itemTotal", "Item Total", FieldType::Number)
            },
        ];

        Self {
            component_key: "generateInvoice",
            title: "Generate Invoice",
            category: "Invoice Generation",
            summary: "Generates an invoice",
            method: "X-CUSTOM",
            tags: vec!["default"],
            source: SourceInfo {
                summary: "Generate an invoice using the external invoice binary",
                links: vec![SourceLink {
                    label: "Invoice Github",
                    url: "https://github.com/maaslalani/invoice",
                }],
            },
            inputs,
            outputs,
        }
    }

    pub fn required_inputs(&self) -> Vec<&'static str> {
        self.inputs
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name)
            .collect()
    }

    pub fn input(&self, name: &str) -> Option<&FieldSpec> {
        self.inputs.iter().find(|field| field.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_inputs() {
        let descriptor = ComponentDescriptor::generate_invoice();
        assert_eq!(descriptor.required_inputs(), vec!["from", "to", "tax", "items"]);
    }

    #[test]
    fn test_tax_bounds() {
        let descriptor = ComponentDescriptor::generate_invoice();
        let tax = descriptor.input("tax").unwrap();
        assert_eq!(tax.minimum, Some(0.0));
        assert_eq!(tax.maximum, Some(1.0));
        assert_eq!(tax.field_type, FieldType::Number);
    }

    #[test]
    fn test_serializes_host_conventions() {
        let value = serde_json::to_value(ComponentDescriptor::generate_invoice()).unwrap();
        assert_eq!(value["componentKey"], "generateInvoice");
        assert_eq!(value["inputs"][0]["x-type"], "text");
        assert_eq!(value["inputs"][0]["default"], "Invoice");
        assert_eq!(value["inputs"][4]["control"], "AlpineNumWithSliderComponent");
        assert_eq!(value["outputs"][1]["x-type"], "document");
        assert_eq!(value["outputs"].as_array().unwrap().len(), 5);
    }
}
