use crate::render;
use anyhow::{anyhow, bail, Context, Result};
use arbor_common::{ColumnType, Row, Schema, Value};
use arbor_query::{sql, Database, Table};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const HELP: &str = "\
Commands:
  tables                               list tables
  create <table> <col:type,...> <pk>   create a table (types: int float str bool)
  drop <table>                         drop a table
  insert <table> <col=val,...>         insert a row
  get <table> <pk>                     fetch one row by primary key
  range <table> <lo> <hi>              rows with lo <= pk <= hi
  all <table>                          every row in key order
  update <table> <pk> <col=val,...>    patch a row
  delete <table> <pk>                  delete a row
  tree <table>                         draw the primary-key index
  save                                 write the snapshot to disk
  load-sql <file>                      replay INSERT statements from a file
  help                                 this text
  exit                                 quit";

pub struct Shell {
    db: Database,
}

impl Shell {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Executes one command line and returns the text to print.
    pub fn execute(&mut self, line: &str) -> Result<String> {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return Ok(String::new());
        };
        let args: Vec<&str> = parts.collect();

        match command {
            "help" => Ok(HELP.to_string()),
            "tables" => {
                let names: Vec<&str> = self.db.list_tables().collect();
                if names.is_empty() {
                    Ok("(no tables)".to_string())
                } else {
                    Ok(names.join("\n"))
                }
            }
            "create" => self.cmd_create(&args),
            "drop" => self.cmd_drop(&args),
            "insert" => self.cmd_insert(&args),
            "get" => self.cmd_get(&args),
            "range" => self.cmd_range(&args),
            "all" => self.cmd_all(&args),
            "update" => self.cmd_update(&args),
            "delete" => self.cmd_delete(&args),
            "tree" => self.cmd_tree(&args),
            "save" => {
                self.db.save()?;
                Ok(format!("saved `{}`", self.db.name()))
            }
            "load-sql" => {
                let [file] = args[..] else {
                    bail!("usage: load-sql <file>")
                };
                let inserted = sql::load_sql_file(&mut self.db, file)?;
                Ok(format!("{} rows loaded", inserted))
            }
            other => bail!("unknown command `{}` (try `help`)", other),
        }
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.db
            .get_table(name)
            .ok_or_else(|| anyhow!("no table `{}`", name))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.db
            .get_table_mut(name)
            .ok_or_else(|| anyhow!("no table `{}`", name))
    }

    fn cmd_create(&mut self, args: &[&str]) -> Result<String> {
        let [table, columns, pk] = args[..] else {
            bail!("usage: create <table> <col:type,...> <pk>")
        };
        let schema = parse_schema(columns)?;
        self.db.create_table(table, schema, pk)?;
        Ok(format!("created `{}`", table))
    }

    fn cmd_drop(&mut self, args: &[&str]) -> Result<String> {
        let [table] = args[..] else {
            bail!("usage: drop <table>")
        };
        if self.db.drop_table(table) {
            Ok(format!("dropped `{}`", table))
        } else {
            bail!("no table `{}`", table)
        }
    }

    fn cmd_insert(&mut self, args: &[&str]) -> Result<String> {
        let [table, assignments] = args[..] else {
            bail!("usage: insert <table> <col=val,...>")
        };
        let table = self.table_mut(table)?;
        let row = parse_assignments(table.schema(), assignments)?;
        table.insert(row)?;
        Ok("inserted 1 row".to_string())
    }

    fn cmd_get(&mut self, args: &[&str]) -> Result<String> {
        let [table, key] = args[..] else {
            bail!("usage: get <table> <pk>")
        };
        let table = self.table(table)?;
        let pk = pk_value(table, key)?;
        match table.select(&pk) {
            Some(row) => Ok(format_row(row)),
            None => Ok("(not found)".to_string()),
        }
    }

    fn cmd_range(&mut self, args: &[&str]) -> Result<String> {
        let [table, lo, hi] = args[..] else {
            bail!("usage: range <table> <lo> <hi>")
        };
        let table = self.table(table)?;
        let lo = pk_value(table, lo)?;
        let hi = pk_value(table, hi)?;
        let rows = table.select_range(&lo, &hi)?;
        if rows.is_empty() {
            return Ok("(no rows)".to_string());
        }
        Ok(rows
            .iter()
            .map(|row| format_row(row))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn cmd_all(&mut self, args: &[&str]) -> Result<String> {
        let [table] = args[..] else {
            bail!("usage: all <table>")
        };
        let table = self.table(table)?;
        let rows: Vec<String> = table.select_all().map(format_row).collect();
        if rows.is_empty() {
            return Ok("(no rows)".to_string());
        }
        Ok(rows.join("\n"))
    }

    fn cmd_update(&mut self, args: &[&str]) -> Result<String> {
        let [table, key, assignments] = args[..] else {
            bail!("usage: update <table> <pk> <col=val,...>")
        };
        let table = self.table_mut(table)?;
        let pk = pk_value(table, key)?;
        let patch = parse_assignments(table.schema(), assignments)?;
        table.update(&pk, &patch)?;
        Ok("updated 1 row".to_string())
    }

    fn cmd_delete(&mut self, args: &[&str]) -> Result<String> {
        let [table, key] = args[..] else {
            bail!("usage: delete <table> <pk>")
        };
        let table = self.table_mut(table)?;
        let pk = pk_value(table, key)?;
        if table.delete(&pk) {
            Ok("deleted 1 row".to_string())
        } else {
            Ok("(not found)".to_string())
        }
    }

    fn cmd_tree(&mut self, args: &[&str]) -> Result<String> {
        let [table] = args[..] else {
            bail!("usage: tree <table>")
        };
        let table = self.table(table)?;
        Ok(render::render(table.index()))
    }
}

fn parse_schema(input: &str) -> Result<Schema> {
    let mut schema = Schema::default();
    for part in input.split(',') {
        let (name, ty) = part
            .split_once(':')
            .ok_or_else(|| anyhow!("bad column `{}` (want name:type)", part))?;
        let ty = match ty {
            "int" => ColumnType::Int,
            "float" => ColumnType::Float,
            "str" => ColumnType::Str,
            "bool" => ColumnType::Bool,
            other => bail!("unknown type `{}`", other),
        };
        schema.insert(name.to_string(), ty);
    }
    Ok(schema)
}

fn parse_value(ty: ColumnType, text: &str) -> Result<Value> {
    let value = match ty {
        ColumnType::Int => Value::Int(
            text.parse()
                .with_context(|| format!("`{}` is not an int", text))?,
        ),
        ColumnType::Float => Value::Float(
            text.parse()
                .with_context(|| format!("`{}` is not a float", text))?,
        ),
        ColumnType::Bool => Value::Bool(
            text.parse()
                .with_context(|| format!("`{}` is not a bool", text))?,
        ),
        ColumnType::Str => Value::Str(text.to_string()),
    };
    Ok(value)
}

fn parse_assignments(schema: &Schema, input: &str) -> Result<Row> {
    let mut row = Row::default();
    for part in input.split(',') {
        let (column, text) = part
            .split_once('=')
            .ok_or_else(|| anyhow!("bad assignment `{}` (want col=val)", part))?;
        let ty = *schema
            .get(column)
            .ok_or_else(|| anyhow!("unknown column `{}`", column))?;
        row.insert(column.to_string(), parse_value(ty, text)?);
    }
    Ok(row)
}

fn pk_value(table: &Table, text: &str) -> Result<Value> {
    let ty = *table
        .schema()
        .get(table.primary_key())
        .ok_or_else(|| anyhow!("table `{}` has no primary key column", table.name()))?;
    parse_value(ty, text)
}

fn format_row(row: &Row) -> String {
    let cells: Vec<String> = row
        .iter()
        .map(|(column, value)| format!("{}={}", column, value))
        .collect();
    cells.join(", ")
}

pub fn run_repl(db: Database) -> Result<()> {
    println!(
        "{}",
        format!(
            "ArborDB shell, database `{}`. Type 'help' for commands, 'exit' to quit.",
            db.name()
        )
        .green()
    );
    let mut shell = Shell::new(db);
    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline(&format!("{} > ", "arbor".blue().bold()));
        match readline {
            Ok(line) => {
                let input = line.trim();
                if input.eq_ignore_ascii_case("exit") {
                    break;
                }
                if input.is_empty() {
                    continue;
                }

                rl.add_history_entry(input)?;

                match shell.execute(input) {
                    Ok(output) if output.is_empty() => {}
                    Ok(output) => println!("{}", output),
                    Err(e) => println!("{} {}", "Error:".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}
