//! Import plans for the monthly PE-04 formation export and the
//! orange-economy program catalog.

use crate::coerce::ColumnKind::{self, Code, Measure, RealCode, RealMeasure, Text, Timestamp};
use crate::columns::FieldSpec;
use crate::header::HeaderRule;
use crate::normalize::{Binding, ImportPlan, TableMapping};

pub const FICHAS_TABLE: &str = "fichas";
pub const ORANGE_CATALOG_TABLE: &str = "programas_economia_naranja";

/// Header keywords of the PE-04 export.
pub const PE04_KEYWORDS: &[&str] = &["IDENTIFICADOR_FICHA", "CODIGO_REGIONAL"];

/// Source labels read from the PE-04 sheet, matched exactly.
const PE04_LABELS: &[&str] = &[
    "IDENTIFICADOR_FICHA",
    "IDENTIFICADOR_UNICO_FICHA",
    "CODIGO_REGIONAL",
    "NOMBRE_REGIONAL",
    "CODIGO_CENTRO",
    "NOMBRE_CENTRO",
    "CODIGO_NIVEL_FORMACION",
    "NIVEL_FORMACION",
    "CODIGO_JORNADA",
    "NOMBRE_JORNADA",
    "CODIGO_SECTOR_PROGRAMA",
    "NOMBRE_SECTOR_PROGRAMA",
    "CODIGO_OCUPACION",
    "NOMBRE_OCUPACION",
    "CODIGO_PROGRAMA",
    "VERSION_PROGRAMA",
    "NOMBRE_PROGRAMA_FORMACION",
    "CODIGO_PAIS_CURSO",
    "NOMBRE_PAIS_CURSO",
    "CODIGO_DEPARTAMENTO_CURSO",
    "NOMBRE_DEPARTAMENTO_CURSO",
    "CODIGO_MUNICIPIO_CURSO",
    "NOMBRE_MUNICIPIO_CURSO",
    "CODIGO_CONVENIO",
    "NOMBRE_CONVENIO",
    "CODIGO_PROGRAMA_ESPECIAL",
    "NOMBRE_PROGRAMA_ESPECIAL",
    "NUMERO_IDENTIFICACION_EMPRESA",
    "NOMBRE_EMPRESA",
    "ESTADO_CURSO",
    "A_LA_MEDIDA",
    "FECHA_INICIO_FICHA",
    "FECHA_TERMINACION_FICHA",
    "ETAPA_FICHA",
    "MODALIDAD_FORMACION",
    "NOMBRE_RESPONSABLE",
    "AMPLICACION_COBERTURA",
    "DESTINO INFORMACIÓN",
    "NUMERO_CURSOS",
    "TOTAL_APRENDICES_MASCULINOS",
    "TOTAL_APRENDICES_FEMENINOS",
    "TOTAL_APRENDICES_NO_BINARIO",
    "TOTAL_APRENDICES",
    "HORAS_PLANTA",
    "HORAS_CONTRATISTAS",
    "HORAS_CONTRATISTAS_EXTERNOS",
    "HORAS_MONITORES",
    "HORAS_INST_EMPRESA",
    "TOTAL_HORAS",
    "TOTAL_APRENDICES_ACTIVO",
    "DURACION_PROGRAMA",
    "NOMBRE_NUEVO_SECTOR",
];

fn field_name(label: &str) -> String {
    label.to_lowercase()
}

fn bind(column: &str, label: &str, kind: ColumnKind) -> Binding {
    Binding::new(column, &field_name(label), kind)
}

fn entity(table: &str, key: &[&str], cols: &[(&str, &str, ColumnKind)]) -> TableMapping {
    TableMapping::entity(
        table,
        key,
        cols.iter().map(|(c, l, k)| bind(c, l, *k)).collect(),
    )
}

/// PE-04: eleven reference tables plus the `fichas` fact table.
pub fn pe04_plan() -> ImportPlan {
    let fields = PE04_LABELS
        .iter()
        .map(|l| FieldSpec::exact(&field_name(l), l))
        .collect();

    let entities = vec![
        entity(
            "regionales",
            &["CODIGO_REGIONAL"],
            &[("CODIGO_REGIONAL", "CODIGO_REGIONAL", Code), ("NOMBRE_REGIONAL", "NOMBRE_REGIONAL", Text)],
        ),
        entity(
            "centros",
            &["CODIGO_CENTRO"],
            &[
                ("CODIGO_CENTRO", "CODIGO_CENTRO", Code),
                ("NOMBRE_CENTRO", "NOMBRE_CENTRO", Text),
                ("CODIGO_REGIONAL", "CODIGO_REGIONAL", Code),
            ],
        ),
        entity(
            "niveles_formacion",
            &["CODIGO_NIVEL_FORMACION"],
            &[
                ("CODIGO_NIVEL_FORMACION", "CODIGO_NIVEL_FORMACION", Code),
                ("NOMBRE_NIVEL_FORMACION", "NIVEL_FORMACION", Text),
            ],
        ),
        entity(
            "jornadas",
            &["CODIGO_JORNADA"],
            &[("CODIGO_JORNADA", "CODIGO_JORNADA", Code), ("NOMBRE_JORNADA", "NOMBRE_JORNADA", Text)],
        ),
        entity(
            "sectores_programa",
            &["CODIGO_SECTOR_PROGRAMA"],
            &[
                ("CODIGO_SECTOR_PROGRAMA", "CODIGO_SECTOR_PROGRAMA", Code),
                ("NOMBRE_SECTOR_PROGRAMA", "NOMBRE_SECTOR_PROGRAMA", Text),
            ],
        ),
        entity(
            "ocupaciones",
            &["CODIGO_OCUPACION"],
            &[("CODIGO_OCUPACION", "CODIGO_OCUPACION", Code), ("NOMBRE_OCUPACION", "NOMBRE_OCUPACION", Text)],
        ),
        entity(
            "programas",
            &["CODIGO_PROGRAMA", "VERSION_PROGRAMA"],
            &[
                ("CODIGO_PROGRAMA", "CODIGO_PROGRAMA", Code),
                ("VERSION_PROGRAMA", "VERSION_PROGRAMA", Code),
                ("NOMBRE_PROGRAMA", "NOMBRE_PROGRAMA_FORMACION", Text),
                ("CODIGO_OCUPACION", "CODIGO_OCUPACION", Code),
                ("CODIGO_SECTOR_PROGRAMA", "CODIGO_SECTOR_PROGRAMA", Code),
            ],
        ),
        entity(
            "ubicaciones",
            &["CODIGO_PAIS", "CODIGO_DEPARTAMENTO", "CODIGO_MUNICIPIO"],
            &[
                ("CODIGO_PAIS", "CODIGO_PAIS_CURSO", Code),
                ("CODIGO_DEPARTAMENTO", "CODIGO_DEPARTAMENTO_CURSO", Code),
                ("CODIGO_MUNICIPIO", "CODIGO_MUNICIPIO_CURSO", Code),
                ("NOMBRE_PAIS", "NOMBRE_PAIS_CURSO", Text),
                ("NOMBRE_DEPARTAMENTO", "NOMBRE_DEPARTAMENTO_CURSO", Text),
                ("NOMBRE_MUNICIPIO", "NOMBRE_MUNICIPIO_CURSO", Text),
            ],
        ),
        entity(
            "convenios",
            &["CODIGO_CONVENIO"],
            &[("CODIGO_CONVENIO", "CODIGO_CONVENIO", RealCode), ("NOMBRE_CONVENIO", "NOMBRE_CONVENIO", Text)],
        ),
        entity(
            "programas_especiales",
            &["CODIGO_PROGRAMA_ESPECIAL"],
            &[
                ("CODIGO_PROGRAMA_ESPECIAL", "CODIGO_PROGRAMA_ESPECIAL", Code),
                ("NOMBRE_PROGRAMA_ESPECIAL", "NOMBRE_PROGRAMA_ESPECIAL", Text),
            ],
        ),
        entity(
            "empresas",
            &["NUMERO_IDENTIFICACION_EMPRESA"],
            &[
                ("NUMERO_IDENTIFICACION_EMPRESA", "NUMERO_IDENTIFICACION_EMPRESA", Text),
                ("NOMBRE_EMPRESA", "NOMBRE_EMPRESA", Text),
            ],
        ),
    ];

    let fact_cols: &[(&str, &str, ColumnKind)] = &[
        ("IDENTIFICADOR_FICHA", "IDENTIFICADOR_FICHA", Code),
        ("IDENTIFICADOR_UNICO_FICHA", "IDENTIFICADOR_UNICO_FICHA", Code),
        ("ESTADO_CURSO", "ESTADO_CURSO", Text),
        ("CODIGO_NIVEL_FORMACION", "CODIGO_NIVEL_FORMACION", Code),
        ("CODIGO_JORNADA", "CODIGO_JORNADA", Code),
        ("A_LA_MEDIDA", "A_LA_MEDIDA", Text),
        ("FECHA_INICIO_FICHA", "FECHA_INICIO_FICHA", Timestamp),
        ("FECHA_TERMINACION_FICHA", "FECHA_TERMINACION_FICHA", Timestamp),
        ("ETAPA_FICHA", "ETAPA_FICHA", Text),
        ("MODALIDAD_FORMACION", "MODALIDAD_FORMACION", Text),
        ("NOMBRE_RESPONSABLE", "NOMBRE_RESPONSABLE", Text),
        ("CODIGO_CENTRO", "CODIGO_CENTRO", Code),
        ("NUMERO_IDENTIFICACION_EMPRESA", "NUMERO_IDENTIFICACION_EMPRESA", Text),
        ("CODIGO_PROGRAMA", "CODIGO_PROGRAMA", Code),
        ("VERSION_PROGRAMA", "VERSION_PROGRAMA", Code),
        ("CODIGO_PAIS_CURSO", "CODIGO_PAIS_CURSO", Code),
        ("CODIGO_DEPARTAMENTO_CURSO", "CODIGO_DEPARTAMENTO_CURSO", Code),
        ("CODIGO_MUNICIPIO_CURSO", "CODIGO_MUNICIPIO_CURSO", Code),
        ("CODIGO_CONVENIO", "CODIGO_CONVENIO", RealCode),
        ("AMPLICACION_COBERTURA", "AMPLICACION_COBERTURA", Text),
        ("DESTINO_INFORMACION", "DESTINO INFORMACIÓN", Text),
        ("CODIGO_PROGRAMA_ESPECIAL", "CODIGO_PROGRAMA_ESPECIAL", Code),
        ("NUMERO_CURSOS", "NUMERO_CURSOS", Measure),
        ("TOTAL_APRENDICES_MASCULINOS", "TOTAL_APRENDICES_MASCULINOS", Measure),
        ("TOTAL_APRENDICES_FEMENINOS", "TOTAL_APRENDICES_FEMENINOS", Measure),
        ("TOTAL_APRENDICES_NO_BINARIO", "TOTAL_APRENDICES_NO_BINARIO", Measure),
        ("TOTAL_APRENDICES", "TOTAL_APRENDICES", Measure),
        ("HORAS_PLANTA", "HORAS_PLANTA", RealMeasure),
        ("HORAS_CONTRATISTAS", "HORAS_CONTRATISTAS", RealMeasure),
        ("HORAS_CONTRATISTAS_EXTERNOS", "HORAS_CONTRATISTAS_EXTERNOS", RealMeasure),
        ("HORAS_MONITORES", "HORAS_MONITORES", RealMeasure),
        ("HORAS_INST_EMPRESA", "HORAS_INST_EMPRESA", RealMeasure),
        ("TOTAL_HORAS", "TOTAL_HORAS", RealMeasure),
        ("TOTAL_APRENDICES_ACTIVO", "TOTAL_APRENDICES_ACTIVO", Measure),
        ("DURACION_PROGRAMA", "DURACION_PROGRAMA", Measure),
        ("NOMBRE_NUEVO_SECTOR", "NOMBRE_NUEVO_SECTOR", Text),
    ];

    ImportPlan {
        name: "pe04".into(),
        header: HeaderRule::Keywords(PE04_KEYWORDS.iter().map(|k| k.to_string()).collect()),
        fields,
        entities,
        fact: Some(TableMapping::fact(
            FICHAS_TABLE,
            &["IDENTIFICADOR_FICHA"],
            fact_cols.iter().map(|(c, l, k)| bind(c, l, *k)).collect(),
        )),
    }
}

/// Orange-economy catalog: first row is the header; code, version and name
/// are all required.
pub fn orange_catalog_plan() -> ImportPlan {
    ImportPlan {
        name: "economia_naranja".into(),
        header: HeaderRule::Fixed(0),
        fields: vec![
            FieldSpec::exact("codigo", "CODIGO"),
            FieldSpec::exact("version", "VERSION"),
            FieldSpec::exact("nombre", "NOMBRE DE PROGRAMA"),
        ],
        entities: vec![TableMapping::entity(
            ORANGE_CATALOG_TABLE,
            &["CODIGO_PROGRAMA", "VERSION_PROGRAMA"],
            vec![
                Binding::new("CODIGO_PROGRAMA", "codigo", Code),
                Binding::new("VERSION_PROGRAMA", "version", Code),
                Binding::new("NOMBRE_PROGRAMA", "nombre", Text),
            ],
        )
        .require(&["NOMBRE_PROGRAMA"])],
        fact: None,
    }
}

/// Tables reported after a formation import, in display order.
pub fn formation_tables() -> Vec<String> {
    let mut names = pe04_plan().table_names();
    let fichas = names.pop();
    names.push(ORANGE_CATALOG_TABLE.to_string());
    names.extend(fichas);
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::grid_from_strs;
    use crate::normalize::{load_grid, LoadOptions};
    use crate::sink::{MemorySink, RelationalSink};
    use crate::value::Value;

    #[test]
    fn plans_are_valid() {
        pe04_plan().validate().unwrap();
        orange_catalog_plan().validate().unwrap();
        assert_eq!(pe04_plan().fact.unwrap().schema.columns.len(), 36);
    }

    #[test]
    fn pe04_rows_split_into_entities_and_facts() {
        let g = grid_from_strs(
            "PE-04",
            &[
                &["REPORTE PE-04"],
                &[
                    "IDENTIFICADOR_FICHA",
                    "CODIGO_REGIONAL",
                    "NOMBRE_REGIONAL",
                    "CODIGO_CENTRO",
                    "NOMBRE_CENTRO",
                    "CODIGO_PROGRAMA",
                    "VERSION_PROGRAMA",
                    "TOTAL_APRENDICES",
                    "DESTINO INFORMACIÓN",
                ],
                &["100", "5", "ANTIOQUIA", "9101", "Centro A", "228106", "1", "30", "SENA"],
                &["101", "5", "ANTIOQUIA", "9102", "Centro B", "228106", "1", "25", ""],
                &["102", "11", "DISTRITO CAPITAL", "9201", "Centro C", "228106", "", "12", ""],
            ],
        );
        let mut sink = MemorySink::new();
        let s = load_grid(&g, &pe04_plan(), &mut sink, LoadOptions::default()).unwrap();

        assert_eq!(s.header_row, 1);
        assert_eq!(s.facts_written, 3);
        assert_eq!(sink.count("regionales").unwrap(), 2);
        assert_eq!(sink.count("centros").unwrap(), 3);
        // third row has no version, so it never reaches `programas`
        assert_eq!(sink.count("programas").unwrap(), 1);
        assert_eq!(sink.count("jornadas").unwrap(), 0);

        let centro = sink.get("centros", &[Value::Integer(9102)]).unwrap().unwrap();
        assert_eq!(centro[2], Value::Integer(5));
        let ficha = sink.get(FICHAS_TABLE, &[Value::Integer(100)]).unwrap().unwrap();
        let schema = sink.schema(FICHAS_TABLE).unwrap();
        assert_eq!(ficha[schema.column_index("TOTAL_APRENDICES").unwrap()], Value::Integer(30));
        assert_eq!(ficha[schema.column_index("DESTINO_INFORMACION").unwrap()], Value::from("SENA"));
        assert_eq!(ficha[schema.column_index("NUMERO_CURSOS").unwrap()], Value::Integer(0));
        assert!(s.warnings.iter().any(|w| w.field == "codigo_jornada"));
    }

    #[test]
    fn reimport_does_not_duplicate_entities() {
        let g = grid_from_strs(
            "PE-04",
            &[&["IDENTIFICADOR_FICHA", "CODIGO_REGIONAL", "NOMBRE_REGIONAL"], &["1", "5", "ANTIOQUIA"]],
        );
        let mut sink = MemorySink::new();
        load_grid(&g, &pe04_plan(), &mut sink, LoadOptions::default()).unwrap();
        let second = load_grid(&g, &pe04_plan(), &mut sink, LoadOptions::default()).unwrap();
        assert_eq!(sink.count("regionales").unwrap(), 1);
        assert_eq!(sink.count(FICHAS_TABLE).unwrap(), 1);
        assert_eq!(second.entity_writes["regionales"], 0);
    }

    #[test]
    fn catalog_requires_name() {
        let g = grid_from_strs(
            "Hoja1",
            &[
                &["CODIGO", "VERSION", "NOMBRE DE PROGRAMA"],
                &["228106", "1", "Animación 3D"],
                &["228107", "2", ""],
            ],
        );
        let mut sink = MemorySink::new();
        load_grid(&g, &orange_catalog_plan(), &mut sink, LoadOptions::default()).unwrap();
        assert_eq!(sink.count(ORANGE_CATALOG_TABLE).unwrap(), 1);
    }

    #[test]
    fn formation_tables_end_with_fichas() {
        let t = formation_tables();
        assert_eq!(t.len(), 13);
        assert_eq!(t.last().map(String::as_str), Some(FICHAS_TABLE));
        assert_eq!(t[11], ORANGE_CATALOG_TABLE);
    }
}
