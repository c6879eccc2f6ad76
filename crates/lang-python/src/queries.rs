//! Tree-sitter queries for Python definitions and imports.

use crate::utils::decl_indices;

pub const PYTHON_DEFINITIONS_SCM: &str = r#"
(function_definition
  name: (identifier) @function.name) @function.def

(class_definition
  name: (identifier) @class.name) @class.def

(import_statement) @import

(import_from_statement) @import.from
"#;

decl_indices!(PythonIndices, {
    function_def => "function.def",
    function_name => "function.name",
    class_def => "class.def",
    class_name => "class.name",
    import => "import",
    import_from => "import.from",
});
