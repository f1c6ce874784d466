use crate::converter::AmountError;
use crate::currency::{Currency, RateSnapshot};
use crate::utils::format_amount;
use serde::{Deserialize, Serialize};

/// The two display languages. Everything user-visible goes through here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "zh-TW")]
    ZhTw,
    #[serde(rename = "en")]
    En,
}

impl Locale {
    fn pick(self, zh: &'static str, en: &'static str) -> &'static str {
        match self {
            Locale::ZhTw => zh,
            Locale::En => en,
        }
    }

    pub fn window_title(self) -> &'static str {
        self.pick("計算機（含匯率轉換・自動抓取）", "Calculator & Currency Converter")
    }

    pub fn calculator_tab(self) -> &'static str {
        self.pick("計算機", "Calculator")
    }

    pub fn converter_tab(self) -> &'static str {
        self.pick("匯率轉換", "Currency")
    }

    pub fn amount_label(self) -> &'static str {
        self.pick("金額：", "Amount:")
    }

    pub fn from_label(self) -> &'static str {
        self.pick("從：", "From:")
    }

    pub fn to_label(self) -> &'static str {
        self.pick("到：", "To:")
    }

    pub fn convert_button(self) -> &'static str {
        self.pick("轉換", "Convert")
    }

    pub fn refresh_button(self) -> &'static str {
        self.pick("更新匯率", "Refresh rates")
    }

    pub fn result_placeholder(self) -> &'static str {
        self.pick("結果：", "Result: ")
    }

    pub fn result(self, value: f64, to: Currency) -> String {
        format!("{}{} {}", self.result_placeholder(), format_amount(value), to)
    }

    pub fn amount_error(self, err: &AmountError) -> String {
        match err {
            AmountError::Empty | AmountError::Invalid(_) => self
                .pick("錯誤：請輸入有效數字", "Error: please enter a valid number")
                .to_string(),
        }
    }

    pub fn currency_error(self) -> &'static str {
        self.pick("錯誤：請選擇有效貨幣", "Error: please select a currency")
    }

    pub fn as_of(self, snapshot: &RateSnapshot) -> String {
        if snapshot.is_live {
            match self {
                Locale::ZhTw => format!("匯率版本：線上匯率 {}（線上）", snapshot.as_of),
                Locale::En => format!("Rates as of {} (live)", snapshot.as_of),
            }
        } else {
            self.pick("匯率版本：預設匯率（離線）", "Rates: built-in defaults (offline)")
                .to_string()
        }
    }

    pub fn status_for(self, snapshot: &RateSnapshot) -> &'static str {
        if snapshot.is_live {
            self.pick("狀態：已更新（線上匯率）", "Status: up to date (live rates)")
        } else {
            self.pick("狀態：使用離線匯率", "Status: using offline rates")
        }
    }

    pub fn status_updating(self) -> &'static str {
        self.pick("狀態：正在更新匯率...", "Status: updating rates...")
    }

    pub fn status_updated(self) -> &'static str {
        self.pick("狀態：已更新。", "Status: updated.")
    }

    pub fn status_failed(self, reason: &str) -> String {
        match self {
            Locale::ZhTw => format!("狀態：更新失敗（沿用目前匯率）。錯誤：{}", reason),
            Locale::En => format!("Status: update failed (keeping current rates). Error: {}", reason),
        }
    }
}
