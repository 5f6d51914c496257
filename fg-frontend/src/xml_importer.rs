//! The concrete [`Importer`] implementation: reads the flattened XML dump
//! produced by the (external, out-of-scope) SV elaborator and builds a
//! `fg_ir::ModuleDef` plus its term table. Grounded on `calyx-backend`'s use
//! of `quick-xml` + `serde` for its YXI interface description
//! (`calyx-backend/src/yxi.rs`), here used in the opposite direction: reading
//! structured XML into typed Rust values rather than writing it.
use fg_ir::TermTable;
use fg_ir::{
    Always, BinaryOp, CompareOp, Decl, Edge, Expr, IfStmt, Initial, Instance, InstanceList,
    LogicalOp, ModuleDef, ModuleItem, PortDecl, PortDirection, SensItem, ShiftOp, Stmt,
    Substitution, Term, TermKind, UnaryOp,
};
use fg_utils::{Error, FgResult, Id};
use serde::Deserialize;

/// Reads one elaborated-design XML document into a `ModuleDef` and the term
/// table derived from its declarations, merging the result into `terms`.
pub trait Importer {
    fn import(&self, xml: &str, terms: &mut TermTable) -> FgResult<(ModuleDef, Vec<Term>)>;
}

pub struct XmlImporter;

impl Importer for XmlImporter {
    fn import(&self, xml: &str, term_table: &mut TermTable) -> FgResult<(ModuleDef, Vec<Term>)> {
        let raw: XmlModule = quick_xml::de::from_str(xml)
            .map_err(|e| Error::invalid_file(format!("malformed elaborated-design XML: {e}")))?;
        raw.lower(term_table)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "module")]
struct XmlModule {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "port", default)]
    ports: Vec<XmlPort>,
    #[serde(rename = "decl", default)]
    decls: Vec<XmlDecl>,
    #[serde(rename = "assign", default)]
    assigns: Vec<XmlAssign>,
    #[serde(rename = "always", default)]
    always: Vec<XmlAlways>,
    #[serde(rename = "initial", default)]
    initial: Vec<XmlInitial>,
    #[serde(rename = "instance_list", default)]
    instance_lists: Vec<XmlInstanceList>,
}

#[derive(Debug, Deserialize)]
struct XmlPort {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@dir")]
    dir: String,
    #[serde(rename = "@width", default = "default_width")]
    width: u64,
    #[serde(rename = "@signed", default)]
    signed: bool,
}

#[derive(Debug, Deserialize)]
struct XmlDecl {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@width", default = "default_width")]
    width: u64,
    #[serde(rename = "@dim", default)]
    dim: Option<u64>,
    #[serde(rename = "@signed", default)]
    signed: bool,
    #[serde(rename = "@reg", default)]
    is_reg: bool,
    #[serde(rename = "@annotation", default)]
    annotation: Option<String>,
}

fn default_width() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
struct XmlAssign {
    lvalue: XmlExpr,
    rvalue: XmlExpr,
}

#[derive(Debug, Deserialize)]
struct XmlSensItem {
    #[serde(rename = "@signal")]
    signal: String,
    #[serde(rename = "@edge", default)]
    edge: String,
}

#[derive(Debug, Deserialize)]
struct XmlAlways {
    #[serde(rename = "sens", default)]
    sens: Vec<XmlSensItem>,
    stmt: XmlStmt,
}

#[derive(Debug, Deserialize)]
struct XmlInitial {
    stmt: XmlStmt,
}

#[derive(Debug, Deserialize)]
struct XmlPortBinding {
    #[serde(rename = "@name")]
    name: String,
    expr: XmlExpr,
}

#[derive(Debug, Deserialize)]
struct XmlParam {
    #[serde(rename = "@name")]
    name: String,
    expr: XmlExpr,
}

#[derive(Debug, Deserialize)]
struct XmlInstance {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "param", default)]
    params: Vec<XmlParam>,
    #[serde(rename = "port_binding", default)]
    port_bindings: Vec<XmlPortBinding>,
}

#[derive(Debug, Deserialize)]
struct XmlInstanceList {
    #[serde(rename = "@module")]
    module: String,
    #[serde(rename = "instance", default)]
    instances: Vec<XmlInstance>,
}

/// Statements are tagged by a `@kind` attribute since quick-xml's serde
/// bridge has no native support for internally-tagged enums over elements;
/// the element's children are interpreted according to `kind`.
#[derive(Debug, Deserialize)]
struct XmlStmt {
    #[serde(rename = "@kind")]
    kind: String,
    #[serde(rename = "@blocking", default)]
    blocking: bool,
    lvalue: Option<XmlExpr>,
    rvalue: Option<XmlExpr>,
    cond: Option<XmlExpr>,
    #[serde(rename = "stmt", default)]
    children: Vec<XmlStmt>,
}

/// Expressions, similarly tagged by `@kind`.
#[derive(Debug, Deserialize, Clone)]
struct XmlExpr {
    #[serde(rename = "@kind")]
    kind: String,
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "@text", default)]
    text: Option<String>,
    #[serde(rename = "@width", default)]
    width: Option<u64>,
    #[serde(rename = "@signed", default)]
    signed: bool,
    #[serde(rename = "var", default)]
    var: Option<Box<XmlExpr>>,
    #[serde(rename = "index", default)]
    index: Option<Box<XmlExpr>>,
    #[serde(rename = "msb", default)]
    msb: Option<Box<XmlExpr>>,
    #[serde(rename = "lsb", default)]
    lsb: Option<Box<XmlExpr>>,
    #[serde(rename = "lhs", default)]
    lhs: Option<Box<XmlExpr>>,
    #[serde(rename = "rhs", default)]
    rhs: Option<Box<XmlExpr>>,
    #[serde(rename = "operand", default)]
    operand: Option<Box<XmlExpr>>,
    #[serde(rename = "then", default)]
    then_val: Option<Box<XmlExpr>>,
    #[serde(rename = "else", default)]
    else_val: Option<Box<XmlExpr>>,
    #[serde(rename = "item", default)]
    items: Vec<XmlExpr>,
}

impl XmlModule {
    fn lower(&self, term_table: &mut TermTable) -> FgResult<(ModuleDef, Vec<Term>)> {
        let mut terms = Vec::new();
        let mut ports = Vec::new();
        for p in &self.ports {
            let direction = match p.dir.as_str() {
                "input" => PortDirection::Input,
                "output" => PortDirection::Output,
                "inout" => PortDirection::Inout,
                other => return Err(Error::unsupported_syntax(format!("port direction `{other}'"))),
            };
            let kind = match direction {
                PortDirection::Input => TermKind::Input,
                PortDirection::Output => TermKind::Output,
                PortDirection::Inout => TermKind::Inout,
            };
            let term = Term::new(p.name.as_str(), p.width, kind);
            term_table.register(term.name, p.width);
            terms.push(term.clone());
            ports.push(PortDecl {
                name: term.name,
                direction,
                width: None,
                signed: p.signed,
            });
        }

        let mut items = Vec::new();
        for d in &self.decls {
            let kind = if d.is_reg { TermKind::Reg } else { TermKind::Wire };
            let mut term = Term::new(d.name.as_str(), d.width, kind);
            if let Some(dim) = d.dim {
                term = term.with_array_dim(dim);
            }
            term.signed = d.signed;
            term_table.register(term.name, d.width);
            terms.push(term.clone());
            items.push(ModuleItem::Decl(Decl {
                name: term.name,
                width: None,
                array_dim: None,
                signed: d.signed,
                is_reg: d.is_reg,
                annotation: d.annotation.clone(),
            }));
        }

        for a in &self.assigns {
            items.push(ModuleItem::ContAssign {
                lvalue: a.lvalue.lower()?,
                rvalue: a.rvalue.lower()?,
            });
        }

        for a in &self.always {
            let senslist = a
                .sens
                .iter()
                .map(|s| {
                    let edge = match s.edge.as_str() {
                        "pos" => Edge::Pos,
                        "neg" => Edge::Neg,
                        _ => Edge::Level,
                    };
                    SensItem { signal: Id::from(s.signal.as_str()), edge }
                })
                .collect();
            items.push(ModuleItem::Always(Always { senslist, body: a.stmt.lower()? }));
        }

        for i in &self.initial {
            items.push(ModuleItem::Initial(Initial { body: i.stmt.lower()? }));
        }

        for l in &self.instance_lists {
            let instances = l
                .instances
                .iter()
                .map(|inst| {
                    Ok(Instance {
                        name: Id::from(inst.name.as_str()),
                        params: inst
                            .params
                            .iter()
                            .map(|p| Ok((Id::from(p.name.as_str()), p.expr.lower()?)))
                            .collect::<FgResult<Vec<_>>>()?,
                        port_bindings: inst
                            .port_bindings
                            .iter()
                            .map(|b| Ok((Id::from(b.name.as_str()), b.expr.lower()?)))
                            .collect::<FgResult<Vec<_>>>()?,
                    })
                })
                .collect::<FgResult<Vec<_>>>()?;
            items.push(ModuleItem::InstanceList(InstanceList {
                module: Id::from(l.module.as_str()),
                instances,
            }));
        }

        Ok((
            ModuleDef {
                name: Id::from(self.name.as_str()),
                params: Vec::new(),
                ports,
                items,
            },
            terms,
        ))
    }
}

impl XmlStmt {
    fn lower(&self) -> FgResult<Stmt> {
        match self.kind.as_str() {
            "substitution" => Ok(Stmt::Substitution(Substitution {
                lvalue: self
                    .lvalue
                    .as_ref()
                    .ok_or_else(|| Error::unsupported_syntax("substitution missing lvalue"))?
                    .lower()?,
                rvalue: self
                    .rvalue
                    .as_ref()
                    .ok_or_else(|| Error::unsupported_syntax("substitution missing rvalue"))?
                    .lower()?,
                blocking: self.blocking,
            })),
            "if" => {
                let cond = self
                    .cond
                    .as_ref()
                    .ok_or_else(|| Error::unsupported_syntax("if missing condition"))?
                    .lower()?;
                let then_branch = Box::new(
                    self.children
                        .first()
                        .ok_or_else(|| Error::unsupported_syntax("if missing then branch"))?
                        .lower()?,
                );
                let else_branch = match self.children.get(1) {
                    Some(s) => Some(Box::new(s.lower()?)),
                    None => None,
                };
                Ok(Stmt::If(IfStmt { cond, then_branch, else_branch }))
            }
            "block" => Ok(Stmt::Block(
                self.children.iter().map(XmlStmt::lower).collect::<FgResult<_>>()?,
            )),
            "null" => Ok(Stmt::Null),
            other => Err(Error::unsupported_syntax(format!("statement kind `{other}'"))),
        }
    }
}

impl XmlExpr {
    fn lower(&self) -> FgResult<Expr> {
        let req = |b: &Option<Box<XmlExpr>>, what: &str| -> FgResult<Expr> {
            b.as_deref()
                .ok_or_else(|| Error::unsupported_syntax(format!("expr missing `{what}'")))?
                .lower()
        };
        Ok(match self.kind.as_str() {
            "ident" => Expr::Ident(Id::from(
                self.name
                    .as_deref()
                    .ok_or_else(|| Error::unsupported_syntax("ident missing name"))?,
            )),
            "int_const" => Expr::IntConst {
                width: self.width,
                signed: self.signed,
                text: self.text.clone().unwrap_or_default(),
            },
            "str_const" => Expr::StrConst(self.text.clone().unwrap_or_default()),
            "partselect" => Expr::PartSelect {
                var: req(&self.var, "var")?.into(),
                msb: req(&self.msb, "msb")?.into(),
                lsb: req(&self.lsb, "lsb")?.into(),
            },
            "pointer" => Expr::Pointer {
                var: req(&self.var, "var")?.into(),
                index: req(&self.index, "index")?.into(),
            },
            "concat" => Expr::Concat(self.items.iter().map(XmlExpr::lower).collect::<FgResult<_>>()?),
            "repeat" => Expr::Repeat {
                times: req(&self.lhs, "lhs")?.into(),
                value: req(&self.rhs, "rhs")?.into(),
            },
            "unary" => Expr::Unary {
                op: unary_op(self.text.as_deref().unwrap_or_default())?,
                operand: req(&self.operand, "operand")?.into(),
            },
            "binary" => Expr::Binary {
                op: binary_op(self.text.as_deref().unwrap_or_default())?,
                lhs: req(&self.lhs, "lhs")?.into(),
                rhs: req(&self.rhs, "rhs")?.into(),
            },
            "compare" => Expr::Compare {
                op: compare_op(self.text.as_deref().unwrap_or_default())?,
                lhs: req(&self.lhs, "lhs")?.into(),
                rhs: req(&self.rhs, "rhs")?.into(),
            },
            "shift" => Expr::Shift {
                op: shift_op(self.text.as_deref().unwrap_or_default())?,
                value: req(&self.lhs, "lhs")?.into(),
                amount: req(&self.rhs, "rhs")?.into(),
            },
            "logical" => Expr::Logical {
                op: if self.text.as_deref() == Some("||") { LogicalOp::Or } else { LogicalOp::And },
                lhs: req(&self.lhs, "lhs")?.into(),
                rhs: req(&self.rhs, "rhs")?.into(),
            },
            "cond" => Expr::Cond {
                cond: req(&self.lhs, "lhs")?.into(),
                then_val: req(&self.then_val, "then")?.into(),
                else_val: req(&self.else_val, "else")?.into(),
            },
            "syscall" => Expr::SystemCall {
                name: Id::from(self.name.as_deref().unwrap_or_default()),
                args: self.items.iter().map(XmlExpr::lower).collect::<FgResult<_>>()?,
            },
            other => return Err(Error::unsupported_syntax(format!("expression kind `{other}'"))),
        })
    }
}

fn unary_op(s: &str) -> FgResult<UnaryOp> {
    Ok(match s {
        "!" => UnaryOp::Not,
        "~" => UnaryOp::BitNot,
        "&" => UnaryOp::ReduceAnd,
        "~&" => UnaryOp::ReduceNand,
        "|" => UnaryOp::ReduceOr,
        "~|" => UnaryOp::ReduceNor,
        "^" => UnaryOp::ReduceXor,
        "~^" | "^~" => UnaryOp::ReduceXnor,
        "+" => UnaryOp::Plus,
        "-" => UnaryOp::Minus,
        other => return Err(Error::unsupported_syntax(format!("unary op `{other}'"))),
    })
}

fn binary_op(s: &str) -> FgResult<BinaryOp> {
    Ok(match s {
        "&" => BinaryOp::And,
        "|" => BinaryOp::Or,
        "^" => BinaryOp::Xor,
        "~^" | "^~" => BinaryOp::Xnor,
        "+" => BinaryOp::Plus,
        "-" => BinaryOp::Minus,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "%" => BinaryOp::Mod,
        "**" => BinaryOp::Pow,
        other => return Err(Error::unsupported_syntax(format!("binary op `{other}'"))),
    })
}

fn compare_op(s: &str) -> FgResult<CompareOp> {
    Ok(match s {
        "==" => CompareOp::Eq,
        "===" => CompareOp::CaseEq,
        "!=" => CompareOp::Neq,
        "!==" => CompareOp::CaseNeq,
        ">" => CompareOp::Gt,
        "<" => CompareOp::Lt,
        ">=" => CompareOp::Geq,
        "<=" => CompareOp::Leq,
        other => return Err(Error::unsupported_syntax(format!("compare op `{other}'"))),
    })
}

fn shift_op(s: &str) -> FgResult<ShiftOp> {
    Ok(match s {
        "<<" => ShiftOp::Sll,
        ">>" => ShiftOp::Srl,
        "<<<" => ShiftOp::Sla,
        ">>>" => ShiftOp::Sra,
        other => return Err(Error::unsupported_syntax(format!("shift op `{other}'"))),
    })
}
