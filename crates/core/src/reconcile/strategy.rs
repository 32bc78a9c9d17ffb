//! Per-entity reconciliation strategies
//!
//! Each variant knows how to pull the natural key out of a raw ERP record,
//! map header and line fields to their local column names and fingerprint
//! them. The [`Reconciler`](super::Reconciler) invokes them uniformly.

use std::collections::BTreeMap;

use erpsync_domain::{
    DispatchRecord, EntityType, GoodsReceiptRecord, ItemRecord, NaturalKey, Result, SyncError,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::fingerprint::fingerprint;
use crate::sync::ports::ExternalRecord;

/// Header fields in local column names, plus their fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedHeader {
    pub fields: Value,
    pub fingerprint: String,
}

/// One line in local column names, keyed by line number within its header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedLine {
    pub line_num: i64,
    pub fields: Value,
    pub fingerprint: String,
}

/// Everything the store needs to apply one record atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileUnit {
    pub key: NaturalKey,
    pub header: MappedHeader,
    pub lines: Vec<MappedLine>,
}

/// Reconciliation strategy, tagged by entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStrategy {
    Items,
    Dispatches,
    GoodsReceipts,
    ProcurementOrders,
}

impl ReconcileStrategy {
    pub const fn for_entity(entity_type: EntityType) -> Self {
        match entity_type {
            EntityType::Items => Self::Items,
            EntityType::Dispatches => Self::Dispatches,
            EntityType::GoodsReceipts => Self::GoodsReceipts,
            EntityType::ProcurementOrders => Self::ProcurementOrders,
        }
    }

    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::Items => EntityType::Items,
            Self::Dispatches => EntityType::Dispatches,
            Self::GoodsReceipts => EntityType::GoodsReceipts,
            Self::ProcurementOrders => EntityType::ProcurementOrders,
        }
    }

    /// Natural key of a raw record.
    pub fn natural_key_of(&self, record: &ExternalRecord) -> Result<NaturalKey> {
        let entity = self.entity_type();
        match self {
            Self::Items => {
                let item: ItemRecord = decode(entity, record)?;
                let code = required_text(entity, "codigoProducto", item.codigo_producto)?;
                Ok(NaturalKey::new(entity, [code]))
            }
            Self::Dispatches => {
                let dispatch: DispatchRecord = decode(entity, record)?;
                dispatch_key(&dispatch)
            }
            Self::GoodsReceipts | Self::ProcurementOrders => {
                let receipt: GoodsReceiptRecord = decode(entity, record)?;
                receipt_key(entity, &receipt)
            }
        }
    }

    /// Natural key from operator-supplied parts (manual sync).
    pub fn key_from_parts(&self, parts: &[String]) -> Result<NaturalKey> {
        let entity = self.entity_type();
        let parts: Vec<String> = parts.iter().map(|p| p.trim().to_string()).collect();
        if parts.iter().any(String::is_empty) {
            return Err(SyncError::InvalidInput(format!("{entity} key parts must not be empty")));
        }

        match self {
            Self::Items if parts.len() == 1 => Ok(NaturalKey::new(entity, parts)),
            Self::Items => Err(SyncError::InvalidInput(format!(
                "{entity} key takes one part (codigoProducto), got {}",
                parts.len()
            ))),
            _ if parts.len() == 2 => {
                // same text as keys built from records, so "0201" finds "201"
                let numbers = parts
                    .iter()
                    .map(|part| {
                        part.parse::<i64>().map(|n| n.to_string()).map_err(|_| {
                            SyncError::InvalidInput(format!(
                                "{entity} key part '{part}' is not a number"
                            ))
                        })
                    })
                    .collect::<Result<Vec<String>>>()?;
                Ok(NaturalKey::new(entity, numbers))
            }
            _ => Err(SyncError::InvalidInput(format!(
                "{entity} key takes two parts (type, document number), got {}",
                parts.len()
            ))),
        }
    }

    /// Fingerprint of mapped header fields.
    pub fn fingerprint_of(&self, fields: &Value) -> String {
        fingerprint(fields)
    }

    /// Header fields in local column names.
    pub fn map_header(&self, record: &ExternalRecord) -> Result<Value> {
        let entity = self.entity_type();
        match self {
            Self::Items => {
                let item: ItemRecord = decode(entity, record)?;
                Ok(json!({
                    "codigo_producto": item.codigo_producto,
                    "descripcion_producto": item.descripcion_producto,
                    "codigo_producto_erp": item.codigo_producto_erp,
                    "codigo_familia": item.codigo_familia,
                    "nombre_familia": item.nombre_familia,
                    "dias_vencimiento": item.dias_vencimiento,
                    "codigo_umb": item.codigo_umb,
                    "descripcion_umb": item.descripcion_umb,
                    "codigo_forma_embalaje": item.codigo_forma_embalaje,
                    "nombre_forma_embalaje": item.nombre_forma_embalaje,
                }))
            }
            Self::Dispatches => {
                let d: DispatchRecord = decode(entity, record)?;
                Ok(json!({
                    "numero_despacho": d.numero_despacho,
                    "tipo_despacho": d.tipo_despacho,
                    "numero_busqueda": d.numero_busqueda,
                    "fecha_creacion": d.fecha_creacion,
                    "fecha_picking": d.fecha_picking,
                    "fecha_carga": d.fecha_carga,
                    "codigo_cliente": d.codigo_cliente,
                    "nombre_cliente": d.nombre_cliente,
                }))
            }
            Self::GoodsReceipts | Self::ProcurementOrders => {
                let r: GoodsReceiptRecord = decode(entity, record)?;
                Ok(json!({
                    "numero_documento": r.numero_documento,
                    "tipo_recepcion": r.tipo_recepcion,
                    "numero_busqueda": r.numero_busqueda,
                    "fecha": r.fecha,
                    "codigo_suplidor": r.codigo_suplidor,
                    "nombre_suplidor": r.nombre_suplidor,
                }))
            }
        }
    }

    /// Lines in local column names, deduplicated by line number (last wins).
    pub fn map_lines(&self, record: &ExternalRecord) -> Result<Vec<MappedLine>> {
        let entity = self.entity_type();
        let mut by_num: BTreeMap<i64, Value> = BTreeMap::new();

        match self {
            Self::Items => {}
            Self::Dispatches => {
                let d: DispatchRecord = decode(entity, record)?;
                for line in d.lines {
                    let num = required_line_num(entity, line.line_num)?;
                    by_num.insert(
                        num,
                        json!({
                            "line_num": num,
                            "codigo_producto": line.codigo_producto,
                            "nombre_producto": line.nombre_producto,
                            "almacen": line.almacen,
                            "cantidad_umb": line.cantidad_umb,
                            "uom_code": line.uom_code,
                            "uom_entry": line.uom_entry,
                        }),
                    );
                }
            }
            Self::GoodsReceipts | Self::ProcurementOrders => {
                let r: GoodsReceiptRecord = decode(entity, record)?;
                for line in r.lines {
                    let num = required_line_num(entity, line.line_num)?;
                    by_num.insert(
                        num,
                        json!({
                            "line_num": num,
                            "codigo_producto": line.codigo_producto,
                            "nombre_producto": line.nombre_producto,
                            "codigo_familia": line.codigo_familia,
                            "nombre_familia": line.nombre_familia,
                            "cantidad": line.cantidad,
                            "unidad_de_medida_umb": line.unidad_de_medida_umb,
                            "uom_entry": line.uom_entry,
                            "uom_code": line.uom_code,
                            "dias_vencimiento": line.dias_vencimiento,
                        }),
                    );
                }
            }
        }

        Ok(by_num
            .into_iter()
            .map(|(line_num, fields)| {
                let fingerprint = fingerprint(&fields);
                MappedLine { line_num, fields, fingerprint }
            })
            .collect())
    }

    /// Key, mapped header and mapped lines for one raw record.
    pub fn build_unit(&self, record: &ExternalRecord) -> Result<ReconcileUnit> {
        let key = self.natural_key_of(record)?;
        let fields = self.map_header(record)?;
        let header = MappedHeader { fingerprint: self.fingerprint_of(&fields), fields };
        let lines = self.map_lines(record)?;
        Ok(ReconcileUnit { key, header, lines })
    }
}

fn decode<T: DeserializeOwned>(entity: EntityType, record: &ExternalRecord) -> Result<T> {
    T::deserialize(record)
        .map_err(|e| SyncError::MalformedRecord(format!("{entity} record does not decode: {e}")))
}

fn required_text(entity: EntityType, field: &str, value: Option<String>) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SyncError::MalformedRecord(format!("{entity} record is missing {field}")))
}

fn required_number(entity: EntityType, field: &str, value: Option<i64>) -> Result<i64> {
    value.ok_or_else(|| SyncError::MalformedRecord(format!("{entity} record is missing {field}")))
}

fn required_line_num(entity: EntityType, value: Option<i64>) -> Result<i64> {
    value.ok_or_else(|| {
        SyncError::MalformedRecord(format!("{entity} record has a line without lineNum"))
    })
}

fn dispatch_key(d: &DispatchRecord) -> Result<NaturalKey> {
    let entity = EntityType::Dispatches;
    let tipo = required_number(entity, "tipoDespacho", d.tipo_despacho)?;
    let numero = required_number(entity, "numeroDespacho", d.numero_despacho)?;
    Ok(NaturalKey::new(entity, [tipo.to_string(), numero.to_string()]))
}

fn receipt_key(entity: EntityType, r: &GoodsReceiptRecord) -> Result<NaturalKey> {
    let tipo = required_number(entity, "tipoRecepcion", r.tipo_recepcion)?;
    let numero = required_number(entity, "numeroDocumento", r.numero_documento)?;
    Ok(NaturalKey::new(entity, [tipo.to_string(), numero.to_string()]))
}
