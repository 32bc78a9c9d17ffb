//! ERP record shapes
//!
//! Field names follow the ERP JSON (camelCase). Every field is optional at the
//! wire level: a record without its natural key still deserializes and is
//! rejected by the reconciler as malformed instead of failing the whole page.
//! Dates are kept as the ERP sent them.

use serde::{Deserialize, Deserializer, Serialize};

/// Product master data. Natural key: `codigoProducto`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub codigo_producto: Option<String>,
    pub descripcion_producto: Option<String>,
    #[serde(rename = "codigoProductoERP")]
    pub codigo_producto_erp: Option<String>,
    pub codigo_familia: Option<i64>,
    pub nombre_familia: Option<String>,
    pub dias_vencimiento: Option<i64>,
    #[serde(rename = "codigoUMB")]
    pub codigo_umb: Option<String>,
    #[serde(rename = "descripcionUMB")]
    pub descripcion_umb: Option<String>,
    pub codigo_forma_embalaje: Option<String>,
    pub nombre_forma_embalaje: Option<String>,
}

/// Dispatch line. Keyed within its header by `lineNum`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchLineRecord {
    pub line_num: Option<i64>,
    pub codigo_producto: Option<String>,
    pub nombre_producto: Option<String>,
    pub almacen: Option<String>,
    #[serde(rename = "cantidadUMB")]
    pub cantidad_umb: Option<f64>,
    #[serde(rename = "uoMCode")]
    pub uom_code: Option<String>,
    #[serde(rename = "uoMEntry")]
    pub uom_entry: Option<i64>,
}

/// Outbound dispatch. Natural key: (`tipoDespacho`, `numeroDespacho`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRecord {
    pub numero_despacho: Option<i64>,
    pub tipo_despacho: Option<i64>,
    pub numero_busqueda: Option<i64>,
    pub fecha_creacion: Option<String>,
    pub fecha_picking: Option<String>,
    pub fecha_carga: Option<String>,
    pub codigo_cliente: Option<String>,
    pub nombre_cliente: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub lines: Vec<DispatchLineRecord>,
}

/// Goods receipt line. Keyed within its header by `lineNum`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodsReceiptLineRecord {
    pub line_num: Option<i64>,
    pub codigo_producto: Option<String>,
    pub nombre_producto: Option<String>,
    pub codigo_familia: Option<i64>,
    pub nombre_familia: Option<String>,
    pub cantidad: Option<f64>,
    #[serde(rename = "unidadDeMedidaUMB")]
    pub unidad_de_medida_umb: Option<String>,
    #[serde(rename = "uoMEntry")]
    pub uom_entry: Option<i64>,
    #[serde(rename = "uoMCode")]
    pub uom_code: Option<String>,
    pub dias_vencimiento: Option<i64>,
}

/// Inbound goods receipt. Natural key: (`tipoRecepcion`, `numeroDocumento`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodsReceiptRecord {
    pub numero_documento: Option<i64>,
    pub tipo_recepcion: Option<i64>,
    pub numero_busqueda: Option<i64>,
    pub fecha: Option<String>,
    pub codigo_suplidor: Option<String>,
    pub nombre_suplidor: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub lines: Vec<GoodsReceiptLineRecord>,
}

/// Procurement orders travel in the goods receipt shape.
pub type ProcurementOrderRecord = GoodsReceiptRecord;

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
