use metagrid_engine::formation::{formation_tables, orange_catalog_plan, pe04_plan, FICHAS_TABLE};
use metagrid_engine::goals::{extract_goals, persist_goals, read_quotas, GOALS_SHEET};
use metagrid_engine::grid::grid_from_strs;
use metagrid_engine::normalize::table_counts;
use metagrid_engine::{load_grid, Cell, EngineError, Grid, GridSet, GridSource, LoadOptions, MemorySink, RelationalSink};

fn pe04_grid() -> Grid {
    grid_from_strs(
        "FORMACION NACIONAL ",
        &[
            &["SERVICIO NACIONAL DE APRENDIZAJE"],
            &["Corte: septiembre"],
            &[],
            &["IDENTIFICADOR_FICHA", "CODIGO_REGIONAL", "NOMBRE_REGIONAL", "CODIGO_JORNADA", "NOMBRE_JORNADA", "TOTAL_APRENDICES"],
            &["2900001", "5", "ANTIOQUIA", "1", "DIURNA", "30"],
            &["2900002", "5", "ANTIOQUIA", "2", "NOCTURNA", "x"],
            &["2900001", "5", "ANTIOQUIA", "1", "DIURNA", "31"],
        ],
    )
}

// -------------------------------------------------------------------------
// Formation import
// -------------------------------------------------------------------------

#[test]
fn first_sheet_import_with_statistics() {
    let mut source = GridSet::new(vec![pe04_grid(), grid_from_strs("Otra", &[&["x"]])]);
    let grid = source.first_grid().unwrap();

    let mut sink = MemorySink::new();
    orange_catalog_plan().create_tables(&mut sink).unwrap();
    let summary = load_grid(&grid, &pe04_plan(), &mut sink, LoadOptions::default()).unwrap();

    assert_eq!(summary.header_row, 3);
    assert_eq!(summary.data_rows, 3);
    assert_eq!(summary.coercion_defaults, 1);
    assert_eq!(sink.count(FICHAS_TABLE).unwrap(), 2);

    let counts = table_counts(&sink, &formation_tables()).unwrap();
    let jornadas = counts.iter().find(|(t, _)| t == "jornadas").unwrap();
    assert_eq!(jornadas.1, 2);
    let naranja = counts.iter().find(|(t, _)| t == "programas_economia_naranja").unwrap();
    assert_eq!(naranja.1, 0);
}

#[test]
fn summary_serializes_for_json_output() {
    let mut sink = MemorySink::new();
    let summary = load_grid(&pe04_grid(), &pe04_plan(), &mut sink, LoadOptions { commit_every: 2 }).unwrap();
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["plan"], "pe04");
    assert_eq!(json["facts_written"], 3);
    assert_eq!(json["entity_writes"]["regionales"], 1);
    assert!(json["warnings"].as_array().unwrap().len() > 10);
}

#[test]
fn sheet_without_header_is_reported() {
    let g = grid_from_strs("S", &[&["sin encabezado"], &["1", "2"]]);
    let err = load_grid(&g, &pe04_plan(), &mut MemorySink::new(), LoadOptions::default()).unwrap_err();
    match err {
        EngineError::HeaderNotFound { sheet, keywords } => {
            assert_eq!(sheet, "S");
            assert!(keywords.contains(&"IDENTIFICADOR_FICHA".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// -------------------------------------------------------------------------
// Goals
// -------------------------------------------------------------------------

#[test]
fn goals_reload_replaces_values() {
    let mut rows = vec![vec![Cell::Empty; 66]; 3];
    let mut row = vec![Cell::Empty; 66];
    row[0] = Cell::Number(11.0);
    row[1] = Cell::Text("DISTRITO CAPITAL".into());
    row[25] = Cell::Number(1000.0);
    rows.push(row.clone());
    let mut source = GridSet::new(vec![Grid::new(GOALS_SHEET, rows.clone())]);

    let mut sink = MemorySink::new();
    let goals = extract_goals(&source.read_grid("metas formacion x regional").unwrap()).unwrap();
    persist_goals(&goals, &mut sink, 2025).unwrap();

    row[25] = Cell::Number(1500.0);
    rows[3] = row;
    let goals = extract_goals(&Grid::new(GOALS_SHEET, rows)).unwrap();
    persist_goals(&goals, &mut sink, 2025).unwrap();

    let quotas = read_quotas(&sink, 2025).unwrap();
    assert_eq!(quotas.len(), 1);
    assert_eq!(quotas[0].value, 1500);
}
