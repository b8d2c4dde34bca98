use crate::model::*;
use serde_json::Value;

/// Visitor pattern for traversing a page immutably
///
/// This trait provides default implementations that walk the entire tree,
/// down into every JSON value nested in section and widget settings.
/// Override specific visit_* methods to perform custom actions on nodes.
pub trait Visitor: Sized {
    fn visit_page(&mut self, page: &PageConfig) {
        walk_page(self, page);
    }

    fn visit_section(&mut self, section: &Section) {
        walk_section(self, section);
    }

    fn visit_widget(&mut self, widget: &Widget) {
        walk_widget(self, widget);
    }

    fn visit_data_source(&mut self, _key: &str, _data_source: &DataSource) {
        // Params are fetch inputs, not content
    }

    fn visit_value(&mut self, value: &Value) {
        walk_value(self, value);
    }

    fn visit_string(&mut self, _value: &str) {
        // Leaf node, no children to walk
    }
}

/// Mutable visitor pattern for transforming a page
///
/// Similar to Visitor, but provides mutable access to nodes.
/// Use this when you need to modify the tree during traversal.
pub trait VisitorMut: Sized {
    fn visit_page_mut(&mut self, page: &mut PageConfig) {
        walk_page_mut(self, page);
    }

    fn visit_section_mut(&mut self, section: &mut Section) {
        walk_section_mut(self, section);
    }

    fn visit_widget_mut(&mut self, widget: &mut Widget) {
        walk_widget_mut(self, widget);
    }

    fn visit_value_mut(&mut self, value: &mut Value) {
        walk_value_mut(self, value);
    }

    fn visit_string_mut(&mut self, _value: &mut String) {
        // Leaf node, no children to walk
    }
}

// Default walk implementations for immutable visitor

pub fn walk_page<V: Visitor>(visitor: &mut V, page: &PageConfig) {
    for section in &page.sections {
        visitor.visit_section(section);
    }
    for (key, data_source) in &page.data_sources {
        visitor.visit_data_source(key, data_source);
    }
}

pub fn walk_section<V: Visitor>(visitor: &mut V, section: &Section) {
    for value in section.settings.values() {
        visitor.visit_value(value);
    }
    for widget in &section.widgets {
        visitor.visit_widget(widget);
    }
}

pub fn walk_widget<V: Visitor>(visitor: &mut V, widget: &Widget) {
    for value in widget.settings.values() {
        visitor.visit_value(value);
    }
}

pub fn walk_value<V: Visitor>(visitor: &mut V, value: &Value) {
    match value {
        Value::String(s) => visitor.visit_string(s),
        Value::Array(items) => {
            for item in items {
                visitor.visit_value(item);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                visitor.visit_value(item);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {
            // Leaf nodes
        }
    }
}

// Default walk implementations for mutable visitor

pub fn walk_page_mut<V: VisitorMut>(visitor: &mut V, page: &mut PageConfig) {
    for section in &mut page.sections {
        visitor.visit_section_mut(section);
    }
}

pub fn walk_section_mut<V: VisitorMut>(visitor: &mut V, section: &mut Section) {
    for value in section.settings.values_mut() {
        visitor.visit_value_mut(value);
    }
    for widget in &mut section.widgets {
        visitor.visit_widget_mut(widget);
    }
}

pub fn walk_widget_mut<V: VisitorMut>(visitor: &mut V, widget: &mut Widget) {
    for value in widget.settings.values_mut() {
        visitor.visit_value_mut(value);
    }
}

pub fn walk_value_mut<V: VisitorMut>(visitor: &mut V, value: &mut Value) {
    match value {
        Value::String(s) => visitor.visit_string_mut(s),
        Value::Array(items) => {
            for item in items {
                visitor.visit_value_mut(item);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                visitor.visit_value_mut(item);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {
            // Leaf nodes
        }
    }
}
