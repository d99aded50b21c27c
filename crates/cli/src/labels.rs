//! Display labels for report columns. Reports carry logical column names;
//! the labels below are what the monthly deliverables show.

use metagrid_engine::Table;

const CAPACITY_LABELS: &[(&str, &str)] = &[
    ("codigo_regional", "Código Regional"),
    ("nombre_regional", "Nombre de la Regional"),
    ("codigo_divipola", "Código DIVIPOLA DANE"),
    ("cupos_doble_titulacion", "Cupos Doble Titulación"),
    ("cupos_formacion_titulada", "Cupos en formación titulada"),
    ("cupos_formacion_complementaria", "Cupos en formación complementaria"),
    ("cupos_fpi_total", "Total Cupos en formación profesional integral"),
    ("cupos_virtualidad", "Cupos de virtualidad"),
    ("cupos_bilinguismo", "Cupos en Bilingüismo"),
];

const APPRENTICE_IDENTITY_LABELS: &[(&str, &str)] = &[
    ("departamento", "DEPARTAMENTO"),
    ("municipio", "MUNICIPIO"),
    ("codigo_divipola", "Código DIVIPOLA - DANE"),
];

/// Metric labels; each gets a " - Corte: {date}" suffix.
const APPRENTICE_METRIC_LABELS: &[(&str, &str)] = &[
    ("doble_titulacion", "Aprendices Doble Titulación"),
    ("formacion_titulada", "Aprendices en formación titulada"),
    ("formacion_complementaria", "Aprendices en formación complementaria"),
    ("formacion_integral", "Total aprendices en formación profesional integral"),
    ("virtualidad", "Aprendices de virtualidad"),
    ("bilinguismo", "Aprendices de bilingüismo"),
    ("contrato_aprendizaje", "Aprendices con contrato de aprendizaje"),
    ("victimas", "Aprendices TOTAL VICTIMAS"),
    ("discapacidad", "Total Aprendices con Discapacidad"),
    ("mujer_cabeza_familia", "Aprendices Mujer Cabeza de Familia"),
    ("tercera_edad", "Aprendices Tercera Edad"),
    ("indigena", "Aprendices Indígena"),
];

fn lookup(labels: &[(&'static str, &'static str)], column: &str) -> Option<&'static str> {
    labels
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, label)| *label)
}

pub fn capacity_label(column: &str) -> Option<String> {
    lookup(CAPACITY_LABELS, column).map(String::from)
}

/// Label for an apprentices column at the given cutoff, e.g.
/// "Aprendices de virtualidad - Corte: 30 de Septiembre 2025".
pub fn apprentice_label(column: &str, cutoff: &str) -> Option<String> {
    if let Some(label) = lookup(APPRENTICE_IDENTITY_LABELS, column) {
        return Some(label.to_string());
    }
    lookup(APPRENTICE_METRIC_LABELS, column).map(|label| format!("{label} - Corte: {cutoff}"))
}

pub fn relabel_capacity(table: &mut Table) {
    table.relabel(capacity_label);
}

pub fn relabel_apprentices(table: &mut Table, cutoff: &str) {
    table.relabel(|c| apprentice_label(c, cutoff));
}

/// Display label of a capacity output, falling back to its logical name.
pub fn capacity_display(column: &str) -> String {
    capacity_label(column).unwrap_or_else(|| column.to_string())
}
