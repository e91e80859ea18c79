use lazy_static::lazy_static;
use regex::Regex;

use crate::document::FieldMap;
use crate::heuristics::RoutingNumberRule;

lazy_static! {
    static ref NAME: Regex =
        Regex::new(r"(Name|Student|Employee|Customer)\s*[:\-]?\s*([A-Z][a-z]+\s[A-Z][a-z]+)").unwrap();
    static ref DATE: Regex = Regex::new(
        r"(Date of Issue|Date|Due Date|Enrollment Date)\s*[:\-]?\s*(\d{2}/\d{2}/\d{4}|\d{4}-\d{2}-\d{2})"
    )
    .unwrap();
    static ref ID: Regex = Regex::new(
        r"(Student ID|Account Number|Employee ID|Transaction ID|Reference Number)\s*[:\-]?\s*(\w+)"
    )
    .unwrap();
    static ref PHONE: Regex = Regex::new(
        r"(Phone|Contact)\s*[:\-]?\s*(\+?\d{1,3}[-.\s]?\(?\d{1,4}\)?[-.\s]?\d{1,4}[-.\s]?\d{1,9})"
    )
    .unwrap();
    static ref EMAIL: Regex = Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap();
    static ref AMOUNT: Regex = Regex::new(
        r"(Total Due|Amount|Balance|Net Pay|Gross Pay)\s*[:\-]?\s*\$?(\d{1,3}(,\d{3})*(\.\d{2})?)"
    )
    .unwrap();
    static ref ADDRESS: Regex =
        Regex::new(r"(Address|Location)\s*[:\-]?\s*([\w\s,]+(?:\d{5}|\d{4}))").unwrap();
    static ref ROUTING: Regex =
        Regex::new(r"(?i)(Routing Number|Routing No\.?|Routing|ABA|RTN)\s*[:\-#]?\s*(\d{9})\b").unwrap();
}

/// 从 OCR 文本中尽力抓取字段，匹配不到的字段直接缺省
pub fn extract_fields(text: &str) -> FieldMap {
    let mut fields = FieldMap::new();

    let captures: [(&str, &Regex, usize); 7] = [
        ("Name", &*NAME, 2),
        ("Date", &*DATE, 2),
        ("ID", &*ID, 2),
        ("Phone", &*PHONE, 2),
        ("Email", &*EMAIL, 0),
        ("Amount", &*AMOUNT, 2),
        ("Address", &*ADDRESS, 2),
    ];
    for (key, pattern, group) in captures {
        if let Some(value) = pattern
            .captures(text)
            .and_then(|c| c.get(group))
            .map(|m| m.as_str().trim().to_string())
        {
            fields.insert(key.to_string(), value);
        }
    }

    if let Some(m) = ROUTING.captures(text).and_then(|c| c.get(2)) {
        fields.insert(RoutingNumberRule::FIELD.to_string(), m.as_str().to_string());
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_statement_sample() {
        let text = "ACME BANK Account Summary March 2025 Customer: John Smith \
                    Account Number: 123456789 Routing Number: 021000021 \
                    Beginning balance: 7,500.00 Ending Balance: 9,624.50 \
                    Contact support@acme-bank.com";
        let fields = extract_fields(text);

        assert_eq!(fields["Name"], "John Smith");
        assert_eq!(fields["ID"], "123456789");
        assert_eq!(fields["routing_number"], "021000021");
        assert_eq!(fields["Amount"], "9,624.50");
        assert_eq!(fields["Email"], "support@acme-bank.com");
    }

    #[test]
    fn payslip_sample() {
        let text = "PAY SLIP Employee: Jane Doe Date: 07/15/2023 Gross Pay: 2,400.00 Net Pay: 1,900.00";
        let fields = extract_fields(text);

        assert_eq!(fields["Name"], "Jane Doe");
        assert_eq!(fields["Date"], "07/15/2023");
        assert_eq!(fields["Amount"], "2,400.00");
        assert!(!fields.contains_key("routing_number"));
    }

    #[test]
    fn nothing_to_extract() {
        assert!(extract_fields("lorem ipsum").is_empty());
        assert!(extract_fields("").is_empty());
    }
}
