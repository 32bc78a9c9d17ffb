//! ERP record fixtures in wire shape (camelCase).

use serde_json::{json, Value};

/// A dispatch with `lines` lines numbered from 1.
pub fn dispatch(tipo: i64, numero: i64, lines: usize) -> Value {
    let lines: Vec<Value> = (1..=lines as i64)
        .map(|n| {
            json!({
                "lineNum": n,
                "codigoProducto": format!("P-{n}"),
                "nombreProducto": format!("Producto {n}"),
                "almacen": "01",
                "cantidadUMB": 10.0 * n as f64,
                "uoMCode": "UN",
                "uoMEntry": 1
            })
        })
        .collect();

    json!({
        "numeroDespacho": numero,
        "tipoDespacho": tipo,
        "numeroBusqueda": numero + 900_000,
        "fechaCreacion": "2024-06-01T08:00:00",
        "codigoCliente": "C-001",
        "nombreCliente": "Supermercado Central",
        "lines": lines
    })
}

pub fn item(code: &str) -> Value {
    json!({
        "codigoProducto": code,
        "descripcionProducto": format!("Producto {code}"),
        "codigoFamilia": 1,
        "nombreFamilia": "Abarrotes",
        "codigoUMB": "UN"
    })
}

pub fn items(count: usize) -> Vec<Value> {
    (1..=count).map(|n| item(&format!("I-{n:03}"))).collect()
}
