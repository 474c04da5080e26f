use std::collections::HashMap;

use log::trace;

use super::{ConstSubst, PropertyTemplate};
use crate::{node::ParseNode, types::Identifier};

/// Key of a mined rule: the operator, its constant children and the side condition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    pub stmt: Identifier,
    pub const_subst: ConstSubst,
    pub template: PropertyTemplate,
}

/// A recognized binary operator schema: applications of `stmt` with the constants of
/// `const_subst`, whose two operands sit at `var_indexes` and have to satisfy `template`.
///
/// Slot `0` and `1` refer to `var_indexes[0]` and `var_indexes[1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralizedStmt {
    pub stmt: Identifier,
    pub const_subst: ConstSubst,
    pub template: PropertyTemplate,
    pub var_indexes: [usize; 2],
}

impl GeneralizedStmt {
    pub fn key(&self) -> RuleKey {
        RuleKey {
            stmt: self.stmt,
            const_subst: self.const_subst.clone(),
            template: self.template.clone(),
        }
    }

    /// Child position of operand slot `slot`
    pub fn position(&self, slot: usize) -> usize {
        self.var_indexes[slot]
    }

    /// Whether `node` applies this operator with the same constants and operand positions
    pub fn matches(&self, node: &ParseNode) -> bool {
        node.stmt() == self.stmt
            && self
                .const_subst
                .var_positions_in(&ConstSubst::from_node(node))
                .map_or(false, |positions| positions == self.var_indexes)
    }

    /// The operand in slot `slot` of `node`
    pub fn operand<'a>(&self, node: &'a ParseNode, slot: usize) -> &'a ParseNode {
        node.child(self.position(slot))
    }

    /// Builds `stmt` applied to `first` in slot 0 and `second` in slot 1
    pub fn build(&self, first: ParseNode, second: ParseNode) -> ParseNode {
        self.const_subst
            .build(self.stmt, &self.var_indexes, &[first, second])
    }

    /// Like [`build`](#method.build), but `inner` goes into slot `from`
    pub fn build_oriented(&self, from: usize, inner: ParseNode, outer: ParseNode) -> ParseNode {
        if from == 0 {
            self.build(inner, outer)
        } else {
            self.build(outer, inner)
        }
    }
}

/// Mined rules of one kind, keyed by [`RuleKey`].
///
/// Registration order is kept per operator so that [`visit`](#method.visit) is deterministic. The
/// first rule registered for a key wins, later ones are counted as collisions.
#[derive(Debug, Clone)]
pub struct RuleMap<V> {
    rules: HashMap<RuleKey, V>,
    index: HashMap<Identifier, Vec<(ConstSubst, Vec<PropertyTemplate>)>>,
    collisions: usize,
}

impl<V> Default for RuleMap<V> {
    fn default() -> Self {
        RuleMap {
            rules: HashMap::new(),
            index: HashMap::new(),
            collisions: 0,
        }
    }
}

/// The rules of a [`RuleMap`] which share operator and constants, see [`RuleMap::visit`]
pub struct RuleGroup<'a, V> {
    map: &'a RuleMap<V>,
    pub stmt: Identifier,
    pub const_subst: &'a ConstSubst,
    templates: &'a [PropertyTemplate],
}

impl<'a, V> RuleGroup<'a, V> {
    pub fn get(&self, template: &PropertyTemplate) -> Option<&'a V> {
        self.map.get(self.stmt, self.const_subst, template)
    }

    pub fn templates(&self) -> impl Iterator<Item = &'a PropertyTemplate> {
        self.templates.iter()
    }
}

impl<V> RuleMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        stmt: Identifier,
        const_subst: &ConstSubst,
        template: &PropertyTemplate,
    ) -> Option<&V> {
        self.rules.get(&RuleKey {
            stmt,
            const_subst: const_subst.clone(),
            template: template.clone(),
        })
    }

    pub fn get_key(&self, key: &RuleKey) -> Option<&V> {
        self.rules.get(key)
    }

    fn register(&mut self, key: &RuleKey) {
        let substs = self.index.entry(key.stmt).or_default();
        match substs.iter_mut().find(|(c, _)| *c == key.const_subst) {
            Some((_, templates)) => templates.push(key.template.clone()),
            None => substs.push((key.const_subst.clone(), vec![key.template.clone()])),
        }
    }

    /// Registers `value` unless the key is taken. Returns whether it was inserted.
    pub fn insert(&mut self, key: RuleKey, value: V) -> bool {
        if self.rules.contains_key(&key) {
            self.collisions += 1;
            trace!("rule for operator {} already registered", key.stmt);
            return false;
        }
        self.register(&key);
        self.rules.insert(key, value);
        true
    }

    /// Returns the entry for `key`, registering `default()` first if it is missing
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: RuleKey, default: F) -> &mut V {
        if !self.rules.contains_key(&key) {
            self.register(&key);
        }
        self.rules.entry(key).or_insert_with(default)
    }

    /// Records a rejected duplicate which was not detected by [`insert`](#method.insert)
    pub fn add_collision(&mut self) {
        self.collisions += 1;
    }

    /// Number of rules that were dropped because their key was already taken
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Calls `f` for every group of rules for `node`'s operator whose constants agree with
    /// `node`, in registration order, together with the operand positions. Returns the first
    /// `Some`.
    pub fn visit<'a, R, F>(&'a self, node: &ParseNode, mut f: F) -> Option<R>
    where
        F: FnMut(RuleGroup<'a, V>, &[usize]) -> Option<R>,
    {
        let substs = self.index.get(&node.stmt())?;
        let node_consts = ConstSubst::from_node(node);
        substs.iter().find_map(|(const_subst, templates)| {
            let var_indexes = const_subst.var_positions_in(&node_consts)?;
            f(
                RuleGroup {
                    map: self,
                    stmt: node.stmt(),
                    const_subst,
                    templates,
                },
                &var_indexes,
            )
        })
    }
}
