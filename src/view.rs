//! View data handed to front ends. Every builder here is a pure function of
//! a table and filter parameters; rendering is left to the caller.

use serde::Serialize;

use crate::config::ViewSettings;
use crate::data::filter::{
    contract_type_options, count_by, group_members, grouped_series, member_preview, top_n, year_bounds,
    yearly_series, CustomerFilter, FeeFilter,
};
use crate::data::model::{CustomerMeasure, CustomerRecord, CustomerTable, FeeRecord, FeeTable, OrganizerTotal};

pub const NO_DATA_MESSAGE: &str = "No data found for this filter";
pub const SELECT_ORGANIZER_MESSAGE: &str = "Select at least one organizer";

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// One pie slice with the names behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub count: usize,
    pub members: Vec<String>,
    /// First few members, one per line, for hover text.
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedPoint {
    pub year: i32,
    pub group: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRow {
    pub name: String,
    pub total_revenue: f64,
    pub contract_type: Option<String>,
}

/// Count per group with the member side table, most frequent first.
pub fn distribution<T, G, N>(rows: &[T], group: G, name: N, preview_limit: usize) -> Vec<Slice>
where
    G: Fn(&T) -> Option<String>,
    N: Fn(&T) -> String,
{
    let counts = count_by(rows, &group);
    let mut members = group_members(rows, &group, name);
    counts
        .into_iter()
        .map(|(label, count)| {
            let names = members.remove(&label).unwrap_or_default();
            Slice {
                preview: member_preview(&names, preview_limit),
                label,
                count,
                members: names,
            }
        })
        .collect()
}

fn bars(rows: &[&CustomerRecord], measure: CustomerMeasure) -> Vec<Bar> {
    rows.iter()
        .filter_map(|r| {
            measure.of(r).map(|value| Bar {
                label: r.name.clone(),
                value,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Customer view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerView {
    pub filter: CustomerFilter,
    pub revenue_column: String,
    pub total_rows: usize,
    pub visible_rows: usize,
    pub year_bounds: Option<(i32, i32)>,
    pub contract_type_options: Vec<String>,
    pub rows: Vec<CustomerRow>,
    pub top_revenue: Vec<Bar>,
    pub contract_distribution: Vec<Slice>,
    pub subscription_growth: Vec<SeriesPoint>,
    pub subscription_split: Vec<Slice>,
    pub top_invoiced: Vec<Bar>,
    /// Set when the filter matched nothing.
    pub message: Option<String>,
}

/// Everything the customer dashboard shows for one filter state.
pub fn customer_view(
    table: &CustomerTable,
    filter: &CustomerFilter,
    visible: &[&CustomerRecord],
    settings: &ViewSettings,
) -> CustomerView {
    let top_revenue = top_n(visible, settings.top_customers, |r| Some(r.total_revenue));

    let invoiced: Vec<&CustomerRecord> = visible
        .iter()
        .copied()
        .filter(|r| r.invoiced_revenue.is_some())
        .collect();
    let top_invoiced = top_n(&invoiced, settings.top_invoiced, |r| r.invoiced_revenue);

    CustomerView {
        filter: filter.clone(),
        revenue_column: table.revenue_column.clone(),
        total_rows: table.len(),
        visible_rows: visible.len(),
        year_bounds: year_bounds(&table.records, |r| r.start_year),
        contract_type_options: contract_type_options(&table.records),
        rows: visible
            .iter()
            .map(|r| CustomerRow {
                name: r.name.clone(),
                total_revenue: r.total_revenue,
                contract_type: r.contract_type.clone(),
            })
            .collect(),
        top_revenue: bars(&top_revenue, CustomerMeasure::TotalRevenue),
        contract_distribution: distribution(
            visible,
            |r| r.contract_type.clone(),
            |r| r.name.clone(),
            settings.member_preview,
        ),
        subscription_growth: yearly_series(visible, |r| r.start_year, |r| r.subscription_revenue)
            .into_iter()
            .map(|(year, value)| SeriesPoint { year, value })
            .collect(),
        subscription_split: distribution(
            visible,
            |r| Some(r.subscription_kind.to_string()),
            |r| r.name.clone(),
            settings.member_preview,
        ),
        top_invoiced: bars(&top_invoiced, CustomerMeasure::InvoicedRevenue),
        message: visible.is_empty().then(|| NO_DATA_MESSAGE.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Fee view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeView {
    pub filter: FeeFilter,
    pub year_bounds: Option<(i32, i32)>,
    /// Fee per year for the searched organizers.
    pub yearly: Vec<SeriesPoint>,
    pub yearly_message: Option<String>,
    pub top_organizers: Vec<OrganizerTotal>,
    pub organizer_options: Vec<String>,
    pub selected: Vec<String>,
    /// Fee per year and organizer for the selection.
    pub comparison: Vec<GroupedPoint>,
    pub comparison_message: Option<String>,
}

/// Everything the fee dashboard shows for one filter state.
pub fn fee_view(
    table: &FeeTable,
    filter: &FeeFilter,
    matching: &[&FeeRecord],
    organizer_options: Vec<String>,
    selected: &[String],
    chosen: &[&FeeRecord],
) -> FeeView {
    let yearly: Vec<SeriesPoint> = yearly_series(matching, |r| Some(r.year), |r| Some(r.fee_amount))
        .into_iter()
        .map(|(year, value)| SeriesPoint { year, value })
        .collect();
    let comparison: Vec<GroupedPoint> = grouped_series(
        chosen,
        |r| Some(r.year),
        |r| Some(r.organizer.clone()),
        |r| Some(r.fee_amount),
    )
    .into_iter()
    .map(|(year, group, value)| GroupedPoint { year, group, value })
    .collect();

    FeeView {
        filter: filter.clone(),
        year_bounds: year_bounds(&table.records, |r| Some(r.year)),
        yearly_message: yearly.is_empty().then(|| NO_DATA_MESSAGE.to_string()),
        yearly,
        top_organizers: table.top_organizers.clone(),
        organizer_options,
        selected: selected.to_vec(),
        comparison_message: selected.is_empty().then(|| SELECT_ORGANIZER_MESSAGE.to_string()),
        comparison,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_attaches_members_in_count_order() {
        let rows = vec![("Abo", "A"), ("Gratis", "B"), ("Abo", "C"), ("Abo", "D")];
        let slices = distribution(&rows, |r| Some(r.0.to_string()), |r| r.1.to_string(), 2);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].label, "Abo");
        assert_eq!(slices[0].count, 3);
        assert_eq!(slices[0].members, vec!["A", "C", "D"]);
        assert_eq!(slices[0].preview, "A\nC\n…");
        assert_eq!(slices[1].preview, "B");
    }

    #[test]
    fn distribution_of_nothing_is_empty() {
        let rows: Vec<(&str, &str)> = Vec::new();
        assert!(distribution(&rows, |r| Some(r.0.to_string()), |r| r.1.to_string(), 10).is_empty());
    }
}
