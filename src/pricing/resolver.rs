//! Price list resolution.
//!
//! Picks the single most specific list out of a set of candidates. Tiers are
//! tried in order and the first tier with any match wins; candidates inside a
//! tier are not ranked further, the first one in input order is returned.

use chrono::NaiveDate;
use serde::Serialize;

use super::models::{PriceList, SalesChannel};

/// Specificity tier a list was resolved at, most specific first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    BranchChannel,
    BranchAllChannels,
    CompanyChannel,
    CompanyAllChannels,
}

type TierPredicate = fn(&PriceList, SalesChannel, Option<i64>) -> bool;

const TIERS: [(ResolutionTier, TierPredicate); 4] = [
    (ResolutionTier::BranchChannel, branch_channel),
    (ResolutionTier::BranchAllChannels, branch_all_channels),
    (ResolutionTier::CompanyChannel, company_channel),
    (ResolutionTier::CompanyAllChannels, company_all_channels),
];

fn branch_channel(list: &PriceList, channel: SalesChannel, branch_id: Option<i64>) -> bool {
    branch_id.is_some() && list.branch_id == branch_id && list.channel == channel
}

fn branch_all_channels(list: &PriceList, _: SalesChannel, branch_id: Option<i64>) -> bool {
    branch_id.is_some() && list.branch_id == branch_id && list.channel == SalesChannel::All
}

fn company_channel(list: &PriceList, channel: SalesChannel, _: Option<i64>) -> bool {
    list.branch_id.is_none() && list.channel == channel
}

fn company_all_channels(list: &PriceList, _: SalesChannel, _: Option<i64>) -> bool {
    list.branch_id.is_none() && list.channel == SalesChannel::All
}

/// Select the winning list for (company, channel, branch) on `as_of`.
///
/// Lists of other companies, inactive lists and lists outside their validity
/// window are ignored even if the caller passes them in.
pub fn select_list<'a>(
    candidates: &'a [PriceList],
    company_id: i64,
    channel: SalesChannel,
    branch_id: Option<i64>,
    as_of: NaiveDate,
) -> Option<(&'a PriceList, ResolutionTier)> {
    let eligible = |list: &PriceList| list.company_id == company_id && list.is_valid_on(as_of);

    TIERS.iter().find_map(|(tier, matches)| {
        candidates
            .iter()
            .find(|&list| eligible(list) && matches(list, channel, branch_id))
            .map(|list| (list, *tier))
    })
}
