//! Matrix commands, and the Sound to Matrix conversion.

use super::decl::*;
use super::{Args, Command, Cx, Payload};
use crate::error::Result;
use crate::interpreter::Formula;
use crate::matrix::{Axis, Matrix};
use crate::objects::{Class, Thing};
use crate::sampled::Sampled;
use crate::sound::Sound;

pub(super) fn register(commands: &mut Vec<Command>) {
    let matrix = || one(Class::Matrix);

    commands.push(command(
        "Get number of rows",
        matrix(),
        "INTEGER_Matrix_getNumberOfRows",
        vec![],
        get_number_of_rows,
    ));
    commands.push(command(
        "Get number of columns",
        matrix(),
        "INTEGER_Matrix_getNumberOfColumns",
        vec![],
        get_number_of_columns,
    ));
    commands.push(command(
        "Get value in cell",
        matrix(),
        "REAL_Matrix_getValueInCell",
        vec![natural("Row number", "1"), natural("Column number", "1")],
        get_value_in_cell,
    ));
    commands.push(command("Get sum", matrix(), "REAL_Matrix_getSum", vec![], get_sum));
    commands.push(command(
        "Formula",
        matrix(),
        "MODIFY_Matrix_formula",
        vec![required(text("formula", "self"))],
        formula,
    ));
    commands.push(command(
        "Save as headerless spreadsheet file",
        matrix(),
        "SAVE_Matrix_writeToHeaderlessSpreadsheetFile",
        vec![required(text("File name", ""))],
        save_as_headerless_spreadsheet,
    ));
    commands.push(command("List values", matrix(), "NUMMAT_Matrix_listValues", vec![], list_values));
    commands.push(command("To Matrix", one(Class::Sound), "NEW_Sound_to_Matrix", vec![], sound_to_matrix));
}

fn get_number_of_rows(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let n = cx.one::<Matrix>()?.n_rows();
    cx.integer(n as i64, "rows")
}

fn get_number_of_columns(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let n = cx.one::<Matrix>()?.n_columns();
    cx.integer(n as i64, "columns")
}

fn get_value_in_cell(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let value = cx.one::<Matrix>()?.value_in_cell(args.index(0)?, args.index(1)?)?;
    cx.real(value, "")
}

fn get_sum(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let sum = cx.one::<Matrix>()?.sum();
    cx.real(sum, "")
}

fn formula(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let formula = Formula::parse(args.text(0)?)?;
    // Work on a copy: the formula may look at other objects in the list.
    let mut matrix = cx.one::<Matrix>()?.clone();
    matrix.apply_formula(|cell| formula.cell_value(&mut *cx, *cell))?;
    *cx.one_mut::<Matrix>()? = matrix;
    Ok(Payload::None)
}

fn save_as_headerless_spreadsheet(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one::<Matrix>()?.save_headerless_spreadsheet(args.text(0)?)?;
    Ok(Payload::None)
}

fn list_values(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    Ok(Payload::Matrix(cx.one::<Matrix>()?.values().clone()))
}

fn sound_to_matrix(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let sound = cx.one::<Sound>()?;
    let x = Axis {
        min: sound.xmin(),
        max: sound.xmax(),
        step: sound.dx(),
        first: sound.x1(),
    };
    let channels = sound.n_channels() as f64;
    let y = Axis {
        min: 0.5,
        max: channels + 0.5,
        step: 1.0,
        first: 1.0,
    };
    let matrix = Matrix::new(x, y, sound.values().clone());
    let name = cx.name_of::<Sound>()?;
    Ok(Payload::Objects(vec![Thing::new(matrix, name.as_deref())]))
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::SeedableRng;

    use super::*;
    use crate::commands::dispatch;
    use crate::diagnostics::{Melder, SharedBuffer};
    use crate::interpreter::{Val, Variables};
    use crate::objects::Environment;
    use crate::value::Value;

    #[test]
    fn formula_sees_cells_and_script_variables() {
        let mut env = Environment::new();
        env.add_new(Thing::new(Matrix::from_values(array![[1.0, 2.0], [3.0, 4.0]]), Some("m")));
        let mut melder = Melder::new(Box::new(SharedBuffer::new()), Box::new(SharedBuffer::new()));
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let mut vars = Variables::new();
        vars.insert("factor".to_string(), Val::Num(10.0));

        let args = [Value::from("self * factor + col")];
        dispatch(&mut env, &mut melder, &mut rng, Some(&vars), "Formula", &args, true).unwrap();
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Get sum", &[], true).unwrap();
        assert_eq!(reply.info, "106\n");
        let args = [Value::Number(2.0), Value::Number(1.0)];
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Get value in cell", &args, true).unwrap();
        assert_eq!(reply.info, "31\n");
    }

    #[test]
    fn raw_text_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.txt");
        std::fs::write(&path, "1 2 3\n4 5 6\n").unwrap();
        let mut env = Environment::new();
        let mut melder = Melder::new(Box::new(SharedBuffer::new()), Box::new(SharedBuffer::new()));
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let args = [Value::String(path.to_string_lossy().into_owned())];
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Read Matrix from raw text file", &args, true).unwrap();
        assert_eq!(env.get(reply.created[0]).unwrap().name(), Some("m"));
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Get number of columns", &[], true).unwrap();
        assert_eq!(reply.info, "3 columns\n");
    }
}
