use std::sync::Arc;

use log::warn;

use crate::config::ViewSettings;
use crate::data::filter::{
    filter_fees, filter_organizers, filtered_indices, organizer_options, year_bounds, CustomerFilter, FeeFilter,
};
use crate::data::model::{CustomerRecord, CustomerTable, FeeTable};
use crate::view::{customer_view, fee_view, CustomerView, FeeView};

// ---------------------------------------------------------------------------
// Customer session state
// ---------------------------------------------------------------------------

/// One user's filter state over the shared customer table.
pub struct CustomerSession {
    table: Arc<CustomerTable>,
    filter: CustomerFilter,
    /// Indices of records passing the current filter (cached).
    visible_indices: Vec<usize>,
}

impl CustomerSession {
    /// Start with no search, no contract restriction and the year ceiling
    /// at the latest start year in the table.
    pub fn new(table: Arc<CustomerTable>) -> Self {
        let filter = CustomerFilter {
            max_start_year: year_bounds(&table.records, |r| r.start_year).map(|(_, hi)| hi),
            ..Default::default()
        };
        let mut session = Self {
            table,
            filter,
            visible_indices: Vec::new(),
        };
        session.refilter();
        session
    }

    pub fn table(&self) -> &CustomerTable {
        &self.table
    }

    pub fn filter(&self) -> &CustomerFilter {
        &self.filter
    }

    /// Recompute `visible_indices` after a filter change.
    fn refilter(&mut self) {
        self.visible_indices = filtered_indices(&self.table.records, &self.filter);
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.filter.name_contains = text.into();
        self.refilter();
    }

    pub fn set_max_start_year(&mut self, year: Option<i32>) {
        self.filter.max_start_year = year;
        self.refilter();
    }

    /// Toggle a single contract type in the selection.
    pub fn toggle_contract_type(&mut self, contract_type: &str) {
        if !self.filter.contract_types.remove(contract_type) {
            self.filter.contract_types.insert(contract_type.to_string());
        }
        self.refilter();
    }

    /// Replace the contract type selection; empty shows every type.
    pub fn select_contract_types<I, S>(&mut self, types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.contract_types = types.into_iter().map(Into::into).collect();
        self.refilter();
    }

    /// Replace the whole filter at once.
    pub fn apply(&mut self, filter: CustomerFilter) {
        self.filter = filter;
        self.refilter();
    }

    pub fn visible(&self) -> Vec<&CustomerRecord> {
        self.visible_indices
            .iter()
            .map(|&i| &self.table.records[i])
            .collect()
    }

    pub fn view(&self, settings: &ViewSettings) -> CustomerView {
        customer_view(&self.table, &self.filter, &self.visible(), settings)
    }
}

// ---------------------------------------------------------------------------
// Fee session state
// ---------------------------------------------------------------------------

/// One user's search, year ceiling and organizer selection over the shared
/// fee table.
pub struct FeeSession {
    table: Arc<FeeTable>,
    filter: FeeFilter,
    /// Organizers offered for comparison (members of the top set).
    options: Vec<String>,
    selected: Vec<String>,
}

impl FeeSession {
    /// Start with the year ceiling at the latest year and the first
    /// `default_organizers` top organizers selected.
    pub fn new(table: Arc<FeeTable>, default_organizers: usize) -> Self {
        let options = organizer_options(&table.top25);
        let selected = options.iter().take(default_organizers).cloned().collect();
        let filter = FeeFilter {
            organizer_contains: String::new(),
            max_year: year_bounds(&table.records, |r| Some(r.year)).map(|(_, hi)| hi),
        };
        Self {
            table,
            filter,
            options,
            selected,
        }
    }

    pub fn table(&self) -> &FeeTable {
        &self.table
    }

    pub fn filter(&self) -> &FeeFilter {
        &self.filter
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.filter.organizer_contains = text.into();
    }

    pub fn set_max_year(&mut self, year: Option<i32>) {
        self.filter.max_year = year;
    }

    /// Replace the comparison selection. Organizers outside the top set are
    /// ignored.
    pub fn select_organizers<I, S>(&mut self, organizers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selected = Vec::new();
        for organizer in organizers.into_iter().map(Into::into) {
            if !self.options.contains(&organizer) {
                warn!("'{organizer}' is not among the top organizers, ignoring");
            } else if !selected.contains(&organizer) {
                selected.push(organizer);
            }
        }
        self.selected = selected;
    }

    pub fn toggle_organizer(&mut self, organizer: &str) {
        if let Some(pos) = self.selected.iter().position(|s| s == organizer) {
            self.selected.remove(pos);
        } else if self.options.iter().any(|o| o == organizer) {
            self.selected.push(organizer.to_string());
        }
    }

    pub fn view(&self) -> FeeView {
        let matching = filter_fees(&self.table.records, &self.filter);
        let chosen = filter_organizers(&self.table.top25, &self.selected);
        fee_view(
            &self.table,
            &self.filter,
            &matching,
            self.options.clone(),
            &self.selected,
            &chosen,
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::fees::rank_organizers;
    use crate::data::model::FeeRecord;
    use crate::view::{NO_DATA_MESSAGE, SELECT_ORGANIZER_MESSAGE};

    fn customer_table() -> Arc<CustomerTable> {
        let rec = |name: &str, contract: Option<&str>, year: Option<i32>, total: f64, sub: Option<f64>, fee: Option<f64>| {
            CustomerRecord::new(
                name.to_string(),
                contract.map(str::to_string),
                year.map(|y| NaiveDate::from_ymd_opt(y, 1, 15).unwrap()),
                total,
                sub,
                fee,
            )
        };
        Arc::new(CustomerTable {
            records: vec![
                rec("Acme", Some("Abo"), Some(2020), 1500.0, Some(1000.0), Some(100.0)),
                rec("Beta", Some("Gratis"), Some(2022), 200.0, None, None),
                rec("Gamma", Some("Abo"), None, 900.0, Some(300.0), Some(50.0)),
                rec("Delta", None, Some(2021), 50.0, Some(0.0), Some(60.0)),
            ],
            revenue_column: "Indtjening".into(),
            subscription_column: "Indtjening på abonnement (pr. år)".into(),
            fee_column: "indtjening gebyr/i alt".into(),
            warnings: Vec::new(),
        })
    }

    fn fee_table() -> Arc<FeeTable> {
        let rec = |org: &str, year: i32, fee: f64| {
            FeeRecord::new(org.to_string(), NaiveDate::from_ymd_opt(year, 3, 1).unwrap(), fee)
        };
        let records = vec![
            rec("Lystrup IF", 2020, 100.0),
            rec("Aarhus Løb", 2020, 400.0),
            rec("Lystrup IF", 2021, 150.0),
            rec("Viby", 2021, 10.0),
            rec("Aarhus Løb", 2022, 20.0),
        ];
        let top_organizers = rank_organizers(&records, 2);
        let top25 = records
            .iter()
            .filter(|r| top_organizers.iter().any(|t| t.organizer == r.organizer))
            .cloned()
            .collect();
        Arc::new(FeeTable {
            records,
            top_organizers,
            top25,
            warnings: Vec::new(),
        })
    }

    #[test]
    fn customer_session_defaults_to_everything() {
        let session = CustomerSession::new(customer_table());
        assert_eq!(session.filter().max_start_year, Some(2022));
        assert_eq!(session.visible().len(), 4);

        let view = session.view(&ViewSettings::default());
        assert_eq!(view.visible_rows, 4);
        assert_eq!(view.message, None);
        assert_eq!(view.year_bounds, Some((2020, 2022)));
        assert_eq!(view.contract_type_options, vec!["Abo", "Gratis"]);
        assert_eq!(view.top_revenue[0].label, "Acme");
        assert_eq!(view.contract_distribution[0].label, "Abo");
        assert_eq!(view.contract_distribution[0].members, vec!["Acme", "Gamma"]);
        assert_eq!(
            view.subscription_growth.iter().map(|p| (p.year, p.value)).collect::<Vec<_>>(),
            vec![(2020, 1000.0), (2021, 0.0), (2022, 0.0)]
        );
        assert_eq!(view.subscription_split[0].label, "Paid");
        assert_eq!(view.subscription_split[0].count, 2);
    }

    #[test]
    fn top_invoiced_skips_rows_without_fee() {
        let session = CustomerSession::new(customer_table());
        let view = session.view(&ViewSettings {
            top_invoiced: 10,
            ..Default::default()
        });
        let labels: Vec<(&str, f64)> = view
            .top_invoiced
            .iter()
            .map(|b| (b.label.as_str(), b.value))
            .collect();
        assert_eq!(labels, vec![("Acme", 1400.0), ("Gamma", 850.0), ("Delta", -10.0)]);
    }

    #[test]
    fn customer_session_filters_update_visible_rows() {
        let mut session = CustomerSession::new(customer_table());
        session.set_max_start_year(Some(2020));
        let names: Vec<&str> = session.visible().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Gamma"]);

        session.toggle_contract_type("Gratis");
        assert!(session.visible().is_empty());
        let view = session.view(&ViewSettings::default());
        assert_eq!(view.message.as_deref(), Some(NO_DATA_MESSAGE));
        assert!(view.contract_distribution.is_empty());
        assert!(view.subscription_growth.is_empty());
        assert!(view.top_revenue.is_empty());

        session.toggle_contract_type("Gratis");
        session.set_search("gam");
        assert_eq!(session.visible().len(), 1);

        session.apply(CustomerFilter::default());
        session.select_contract_types(["Abo"]);
        assert_eq!(session.visible().len(), 2);
    }

    #[test]
    fn fee_session_preselects_top_organizers() {
        let session = FeeSession::new(fee_table(), 5);
        assert_eq!(session.selected(), ["Lystrup IF", "Aarhus Løb"]);
        assert_eq!(session.filter().max_year, Some(2022));

        let view = session.view();
        assert_eq!(view.yearly_message, None);
        assert_eq!(
            view.yearly.iter().map(|p| (p.year, p.value)).collect::<Vec<_>>(),
            vec![(2020, 500.0), (2021, 160.0), (2022, 20.0)]
        );
        assert_eq!(view.comparison.len(), 4);
        assert_eq!(view.comparison[0].group, "Aarhus Løb");
        assert_eq!(view.comparison_message, None);
    }

    #[test]
    fn fee_session_messages_for_empty_states() {
        let mut session = FeeSession::new(fee_table(), 1);
        assert_eq!(session.selected(), ["Lystrup IF"]);

        session.set_search("findes ikke");
        session.select_organizers(Vec::<String>::new());
        let view = session.view();
        assert!(view.yearly.is_empty());
        assert_eq!(view.yearly_message.as_deref(), Some(NO_DATA_MESSAGE));
        assert!(view.comparison.is_empty());
        assert_eq!(view.comparison_message.as_deref(), Some(SELECT_ORGANIZER_MESSAGE));
    }

    #[test]
    fn fee_session_ignores_organizers_outside_top_set() {
        let mut session = FeeSession::new(fee_table(), 0);
        session.select_organizers(["Viby", "Aarhus Løb", "Aarhus Løb"]);
        assert_eq!(session.selected(), ["Aarhus Løb"]);

        session.toggle_organizer("Lystrup IF");
        session.toggle_organizer("Aarhus Løb");
        session.toggle_organizer("Viby");
        assert_eq!(session.selected(), ["Lystrup IF"]);

        session.set_max_year(Some(2020));
        let view = session.view();
        assert_eq!(view.yearly.len(), 1);
        assert_eq!(view.yearly[0].value, 500.0);
    }
}
