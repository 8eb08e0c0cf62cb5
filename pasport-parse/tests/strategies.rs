use pasport_ast::{Span, StmtKind, Unit};
use pasport_parse::{build_unit, parse_tree, Strategy, SyntaxKind};

const MODEL: &str = r#"
unit PersonModel;

interface

type
  TPerson = class
  private
    cID: Integer;
    cFirst, cLast: string;
    cBirth: TDateTime;
    cClient: Integer;
  public
    constructor Create(const AFirst, ALast: string);
    function FullName: string;
    property First: string read cFirst write cFirst;
  end;

  TAddress = record
    Street: string;
    Zip: Integer;
  end;

procedure AddPerson(APerson : TPerson);

implementation

constructor TPerson.Create(const AFirst, ALast: string);
begin
  cFirst := AFirst;
  cLast := ALast;
end;

function TPerson.FullName: string;
begin
  Result := cFirst + ' ' + cLast;
end;

procedure AddPerson(APerson : TPerson);
begin
  with Module.mtPerson do
  begin
    Append;
    FieldByName('First').AsString := APerson.cFirst;
    Post;
  end;
end;

end.
"#;

const VIEW: &str = r#"
unit PersonView;

interface

uses
  Vcl.Forms, Vcl.StdCtrls, PersonModel, PersonController;

type
  TPersonForm = class(TForm)
    edFirst: TEdit;
    edLast: TEdit;
    btnSave: TButton;
    procedure btnSaveClick(Sender: TObject);
  private
    { Private declarations }
    FPerson: TPerson;
  end;

var
  PersonForm: TPersonForm;

implementation

{$R *.dfm}

procedure TPersonForm.btnSaveClick(Sender: TObject);
var
  Person: TPerson;
begin
  Person := TPerson.Create(edFirst.Text, edLast.Text);
  AddPerson(Person);
  ShowMessage('Saved; thank you');
end;

end.
"#;

// Statements and spans are the only data the two strategies may disagree on.
fn comparable(mut unit: Unit) -> Unit {
    let routines = unit
        .procedures
        .iter_mut()
        .chain(unit.classes.iter_mut().flat_map(|c| c.methods.iter_mut()));
    for p in routines {
        p.statements.clear();
        p.span = Span::zero();
    }
    for class in &mut unit.classes {
        class.span = Span::zero();
        for field in &mut class.fields {
            field.span = Span::zero();
        }
    }
    unit
}

#[test]
fn tree_and_scan_agree() {
    for src in [MODEL, VIEW] {
        let tree = build_unit(src, "X", Strategy::Tree);
        let scan = build_unit(src, "X", Strategy::Scan);
        assert!(tree.errors.is_empty(), "{:?}", tree.errors);
        assert_eq!(tree.strategy, Strategy::Tree);
        assert_eq!(scan.strategy, Strategy::Scan);
        assert_eq!(comparable(tree.unit), comparable(scan.unit));
    }
}

#[test]
fn model_unit_shape() {
    let unit = build_unit(MODEL, "X", Strategy::Auto).unit;
    assert_eq!(unit.name, "PersonModel");

    let person = unit.class("TPerson").unwrap();
    let fields: Vec<_> = person.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["cID", "cFirst", "cLast", "cBirth", "cClient"]);
    assert_eq!(person.methods.len(), 2);
    let create = &person.methods[0];
    assert!(create.has_body);
    assert_eq!(create.parameters.len(), 2);
    assert_eq!(create.parameters[1].name, "ALast");
    assert_eq!(create.parameters[1].type_name, "string");

    let address = unit.class("TAddress").unwrap();
    assert!(address.is_record);
    assert_eq!(address.fields.len(), 2);

    // The interface declaration is completed by the implementation.
    assert_eq!(unit.procedures.len(), 1);
    let add = &unit.procedures[0];
    assert!(add.has_body);
    assert_eq!(add.parameters[0].type_name, "TPerson");
    assert!(add.body.contains("with Module.mtPerson do"));
}

#[test]
fn scanner_leaves_statements_empty() {
    let unit = build_unit(VIEW, "X", Strategy::Scan).unit;
    assert!(unit.classes[0].methods[0].statements.is_empty());

    let unit = build_unit(VIEW, "X", Strategy::Tree).unit;
    let click = &unit.classes[0].methods[0];
    assert_eq!(click.statements.len(), 3);
    assert!(matches!(&click.statements[1].kind, StmtKind::Call { callee, .. } if callee == "AddPerson"));
}

#[test]
fn auto_falls_back_to_scanning_when_lexing_fails() {
    let src = r#"unit Odd;
implementation
procedure Run;
begin
  ShowMessage("double quotes are not Pascal");
end;
end."#;

    let out = build_unit(src, "X", Strategy::Auto);
    assert_eq!(out.strategy, Strategy::Scan);
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.unit.name, "Odd");
    assert!(out.unit.procedures[0].body.starts_with("ShowMessage("));

    let out = build_unit(src, "X", Strategy::Tree);
    assert_eq!(out.strategy, Strategy::Tree);
    assert!(out.unit.is_empty());
    assert_eq!(out.unit.name, "X");
}

#[test]
fn block_comments_do_not_stop_the_tree_builder() {
    let src = MODEL
        .replace("interface\n", "interface\n(* legacy note: see *TPerson* (v2) *)\n")
        .replace("  Append;\n", "  Append; (* first row *)\n");
    for strategy in [Strategy::Tree, Strategy::Auto] {
        let out = build_unit(&src, "X", strategy);
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.strategy, Strategy::Tree);
        assert_eq!(out.unit.classes.len(), 2);
        assert_eq!(out.unit.procedures.len(), 1);

        let mut statements = 0;
        for stmt in &out.unit.procedures[0].statements {
            stmt.visit(&mut |_| statements += 1);
        }
        // with, its compound body, then Append, the assignment and Post.
        assert_eq!(statements, 5);
    }
}

#[test]
fn bad_member_is_skipped_and_reported() {
    let src = "unit Broken;\ninterface\ntype\n  TGood = class\n    A: Integer;\n    B Integer;\n    C: string;\n  end;\nimplementation\nend.";
    let out = build_unit(src, "X", Strategy::Tree);
    assert_eq!(out.errors.len(), 1);
    let fields: Vec<_> = out.unit.classes[0].fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["A", "C"]);
}

#[test]
fn bad_statement_is_skipped_and_reported() {
    let src = "program P;\nprocedure Run;\nbegin\n  while X;\n  Z := 1;\nend;\nbegin\nend.";
    let out = build_unit(src, "X", Strategy::Tree);
    assert_eq!(out.errors.len(), 1);
    let run = &out.unit.procedures[0];
    assert!(run.has_body);
    assert_eq!(run.statements.len(), 1);
    assert!(matches!(&run.statements[0].kind, StmtKind::Assign { target, .. } if target == "Z"));
}

#[test]
fn empty_source_is_an_empty_unit() {
    for strategy in [Strategy::Tree, Strategy::Scan, Strategy::Auto] {
        let out = build_unit("", "Empty", strategy);
        assert!(out.unit.is_empty());
        assert_eq!(out.unit.name, "Empty");
        assert!(out.errors.is_empty());
    }
}

#[test]
fn syntax_tree_keeps_node_kinds() {
    let tree = parse_tree(VIEW).unwrap();
    let kinds: Vec<_> = tree.root.nodes().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SyntaxKind::UnitHeader,
            SyntaxKind::UsesClause,
            SyntaxKind::TypeDecl,
            SyntaxKind::LocalDecls,
            SyntaxKind::RoutineDecl,
        ]
    );
    let routine = tree.root.child(SyntaxKind::RoutineDecl).unwrap();
    assert!(routine.child(SyntaxKind::LocalDecls).is_some());
    assert!(routine.descendants().iter().any(|n| n.kind == SyntaxKind::SimpleStmt));
}

#[test]
fn strategy_names_parse() {
    assert_eq!("SCAN".parse::<Strategy>(), Ok(Strategy::Scan));
    assert_eq!(Strategy::default(), Strategy::Auto);
    assert!("regex".parse::<Strategy>().is_err());
}
