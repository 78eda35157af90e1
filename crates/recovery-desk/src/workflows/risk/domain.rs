use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for debtor records owned by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DebtorId(pub String);

/// Direction of a ledger movement relative to the debtor's liability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Increases the liability (new charge, penalty, delivered goods).
    Debit,
    /// Decreases the liability (payment received).
    Credit,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Debit => "debit",
            EntryKind::Credit => "credit",
        }
    }

    fn signed(&self, amount: f64) -> f64 {
        match self {
            EntryKind::Debit => amount,
            EntryKind::Credit => -amount,
        }
    }
}

/// Unit a ledger entry is denominated in. Balances are tracked per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerUnit {
    Currency,
    Commodity,
}

impl LedgerUnit {
    pub fn label(&self) -> &'static str {
        match self {
            LedgerUnit::Currency => "currency",
            LedgerUnit::Commodity => "commodity",
        }
    }
}

/// One recorded movement on a debtor's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub kind: EntryKind,
    pub unit: LedgerUnit,
    pub amount: f64,
    pub occurred_on: NaiveDate,
    pub running_balance_after: f64,
}

impl LedgerEntry {
    pub fn is_payment(&self) -> bool {
        self.kind == EntryKind::Credit
    }

    /// Amount with the sign applied to the liability (debits add, credits subtract).
    pub fn signed_amount(&self) -> f64 {
        self.kind.signed(self.amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactChannel {
    Chat,
    VoiceCall,
    Other,
}

impl From<OutboundChannel> for ContactChannel {
    fn from(channel: OutboundChannel) -> Self {
        match channel {
            OutboundChannel::Chat => ContactChannel::Chat,
            OutboundChannel::Sms | OutboundChannel::Push => ContactChannel::Other,
        }
    }
}

/// Entry from the communications log, reduced to what the engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub channel: ContactChannel,
    pub occurred_at: DateTime<Utc>,
}

/// Debtor snapshot as supplied by the persistence layer. The engine only borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debtor {
    pub id: DebtorId,
    #[serde(default)]
    pub name: String,
    pub current_balance: f64,
    #[serde(default)]
    pub current_commodity_balance: f64,
    #[serde(default)]
    pub transactions: Vec<LedgerEntry>,
    #[serde(default)]
    pub last_chat_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_call_at: Option<DateTime<Utc>>,
}

/// Outbound reminder channels a grade rule can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundChannel {
    Chat,
    Sms,
    Push,
}

impl OutboundChannel {
    pub fn label(&self) -> &'static str {
        match self {
            OutboundChannel::Chat => "chat",
            OutboundChannel::Sms => "sms",
            OutboundChannel::Push => "push",
        }
    }
}

/// Channel enablement flags carried on a grade rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelToggles {
    pub chat: bool,
    pub sms: bool,
    pub push: bool,
}

impl Default for ChannelToggles {
    fn default() -> Self {
        Self {
            chat: true,
            sms: false,
            push: false,
        }
    }
}

impl ChannelToggles {
    pub fn allows(&self, channel: OutboundChannel) -> bool {
        match channel {
            OutboundChannel::Chat => self.chat,
            OutboundChannel::Sms => self.sms,
            OutboundChannel::Push => self.push,
        }
    }
}

/// Message template references per channel. Opaque to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<String>,
}

impl TemplateRefs {
    pub fn for_channel(&self, channel: OutboundChannel) -> Option<&str> {
        match channel {
            OutboundChannel::Chat => self.chat.as_deref(),
            OutboundChannel::Sms => self.sms.as_deref(),
            OutboundChannel::Push => self.push.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownUnit {
    Hours,
    Days,
}

impl CooldownUnit {
    /// Normalizes a cooldown amount in this unit to hours.
    pub fn to_hours(&self, amount: u32) -> i64 {
        match self {
            CooldownUnit::Hours => i64::from(amount),
            CooldownUnit::Days => i64::from(amount) * 24,
        }
    }
}

/// One administrator-editable row of the grading waterfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRule {
    /// Grade label assigned when this rule matches, e.g. "A".."D".
    pub id: String,
    /// Ascending; lower values are evaluated first.
    pub priority: i32,
    pub min_balance: f64,
    pub min_days_since_payment: u32,
    pub min_days_since_contact: u32,
    pub cooldown_amount: u32,
    pub cooldown_unit: CooldownUnit,
    #[serde(default)]
    pub channels: ChannelToggles,
    #[serde(default)]
    pub templates: TemplateRefs,
}

impl GradeRule {
    pub fn cooldown_hours(&self) -> i64 {
        self.cooldown_unit.to_hours(self.cooldown_amount)
    }

    /// True when every threshold is zero, so the rule matches any debtor.
    pub fn is_catch_all(&self) -> bool {
        self.min_balance <= 0.0
            && self.min_days_since_payment == 0
            && self.min_days_since_contact == 0
    }
}
