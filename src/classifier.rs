use crate::document::DocumentType;

/// 只看 OCR 文本的前这么多个字符
pub const MAX_TEXT_CHARS: usize = 4000;

/// 文档类型分类器接口
///
/// 生成式模型、零样本模型都挂在这个 trait 后面。返回候选集以外的标签是允许的，
/// 调用方会把它当作 `Unknown` 处理。
pub trait DocumentClassifier: Send + Sync {
    fn classify(&self, text: &str, labels: &[&str]) -> anyhow::Result<String>;
}

/// 关键词打分分类器（无模型时的默认实现）
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    fn keywords(document_type: DocumentType) -> &'static [&'static str] {
        match document_type {
            DocumentType::BankStatement => &[
                "bank",
                "statement",
                "beginning balance",
                "ending balance",
                "deposits",
                "withdrawals",
                "routing",
            ],
            DocumentType::W2TaxForm => &["w-2", "wage and tax statement", "federal income tax withheld"],
            DocumentType::Form1099 => &["1099", "payer", "recipient", "nonemployee compensation"],
            DocumentType::CellPhoneBill => &["wireless", "cell phone", "mobile", "data usage"],
            DocumentType::SchoolEnrollment => &["enrollment", "student", "school"],
            DocumentType::Payslip => &["pay slip", "payslip", "gross pay", "net pay", "deductions"],
            DocumentType::UtilityWater => &["water"],
            DocumentType::UtilityElectricity => &["electricity", "electric", "kwh"],
            DocumentType::UtilityGas => &["gas services", "natural gas", "therms"],
            DocumentType::Unknown => &[],
        }
    }
}

impl DocumentClassifier for KeywordClassifier {
    fn classify(&self, text: &str, labels: &[&str]) -> anyhow::Result<String> {
        let snippet: String = text.chars().take(MAX_TEXT_CHARS).collect::<String>().to_lowercase();

        let best = labels
            .iter()
            .filter_map(|label| {
                let document_type = DocumentType::from_label(label);
                let score = Self::keywords(document_type)
                    .iter()
                    .filter(|kw| snippet.contains(*kw))
                    .count();
                (score > 0).then_some((score, *label))
            })
            // 同分时取候选列表中靠前的标签
            .fold(None, |best: Option<(usize, &str)>, (score, label)| match best {
                Some((top, _)) if top >= score => best,
                _ => Some((score, label)),
            });

        Ok(best
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| DocumentType::Unknown.label().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> DocumentType {
        let label = KeywordClassifier
            .classify(text, &DocumentType::CANDIDATE_LABELS)
            .unwrap();
        DocumentType::from_label(&label)
    }

    #[test]
    fn recognises_sample_documents() {
        assert_eq!(
            classify("ACME BANK Account Statement Beginning balance: 7,500.00 Ending balance: 8,250.25"),
            DocumentType::BankStatement
        );
        assert_eq!(
            classify("PAY SLIP Employee: John Smith Gross Pay: 2,400.00 Net Pay: 1,900.00"),
            DocumentType::Payslip
        );
        assert_eq!(
            classify("Form W-2, Wage and Tax Statement Box 2: Federal income tax withheld"),
            DocumentType::W2TaxForm
        );
    }

    #[test]
    fn no_keywords_is_unknown() {
        assert_eq!(classify("lorem ipsum dolor sit amet"), DocumentType::Unknown);
        assert_eq!(classify(""), DocumentType::Unknown);
    }

    #[test]
    fn restricted_label_set() {
        let label = KeywordClassifier
            .classify("ending balance at ACME bank", &["employee payslip"])
            .unwrap();
        assert_eq!(label, "Unknown");
    }
}
