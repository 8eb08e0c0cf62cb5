use pasport_core::{LoweringOptions, SemanticContext, SemanticType, lower_all};
use pasport_ir::{BackendParam, CallArgument, EntityField, UiField};
use pasport_parse::{Strategy, build_unit};

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

fn analyzed(sources: &[&str]) -> SemanticContext {
    let mut ctx = SemanticContext::new();
    for src in sources {
        let out = build_unit(src, "Unnamed", Strategy::Tree);
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        ctx.load(out.unit);
    }
    ctx.analyze();
    ctx
}

#[test]
fn data_procedure_writes_and_lowers_to_actions() {
    let ctx = analyzed(&[MODEL, VIEW]);
    let add = ctx.procedure("AddPerson").unwrap();
    assert!(add.writes.contains("Module.mtPerson"));
    assert!(!add.is_ui);
    assert_eq!(add.reads.iter().collect::<Vec<_>>(), vec!["APerson.*"]);
    assert_eq!(add.parameters["APerson"], SemanticType::named("PersonModel.TPerson"));

    let docs = lower_all(&ctx, &LoweringOptions::default());
    assert_eq!(docs.backend.procedures.len(), 1);
    let proc = &docs.backend.procedures[0];
    assert_eq!(proc.name, "AddPerson");
    assert_eq!(proc.params, vec![BackendParam::new("APerson", "PersonModel.TPerson")]);
    assert_eq!(
        proc.actions,
        vec!["open mtPerson", "append row", "write Person fields", "commit"]
    );
}

#[test]
fn event_handler_is_ui_and_binds_backend_call() {
    let ctx = analyzed(&[MODEL, VIEW]);
    let click = ctx.procedure("btnSaveClick").unwrap();
    assert!(click.is_ui);
    assert_eq!(click.owner.as_deref(), Some("TPersonForm"));
    assert_eq!(click.creates.first().map(String::as_str), Some("TPerson"));
    assert!(click.calls.contains("AddPerson"));
    assert!(ctx.is_constructor_call("Create"));
    assert!(!ctx.is_constructor_call("AddPerson"));

    let docs = lower_all(&ctx, &LoweringOptions::default());
    assert!(docs.backend.procedure("btnSaveClick").is_none());
    assert_eq!(docs.ui.ui_actions.len(), 1);
    let action = &docs.ui.ui_actions[0];
    assert_eq!(action.name, "btnSaveClick");
    assert_eq!(action.kind, "submit");
    assert_eq!(action.form.entity, "TPerson");
    assert_eq!(
        action.form.fields,
        vec![
            UiField::new("first", "string"),
            UiField::new("last", "string"),
            UiField::new("birth", "date"),
        ]
    );
    assert_eq!(action.backend_call.procedure, "AddPerson");
    assert_eq!(
        action.backend_call.arguments,
        vec![CallArgument { type_name: "TPerson".into(), source: "form".into() }]
    );
}

#[test]
fn entities_skip_view_classes() {
    let ctx = analyzed(&[MODEL, VIEW]);
    let docs = lower_all(&ctx, &LoweringOptions::default());
    let names: Vec<_> = docs.entities.entities.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["TPerson", "TAddress"]);
    assert_eq!(
        docs.entities.entity("TPerson").unwrap().fields,
        vec![
            EntityField::new("id", "int"),
            EntityField::new("first", "string"),
            EntityField::new("last", "string"),
            EntityField::new("birth", "date"),
            EntityField::new("client", "int"),
        ]
    );
}

#[test]
fn bodiless_routines_have_no_effects() {
    let src = r#"
unit Imports;

interface

procedure SaveToTable(const Table: string);
procedure Beep; external 'kernel32.dll';

implementation

end.
"#;
    let ctx = analyzed(&[src]);
    assert_eq!(ctx.procedures().len(), 2);
    assert!(ctx.procedures().iter().all(|p| !p.has_body && !p.has_effects()));

    let docs = lower_all(&ctx, &LoweringOptions::default());
    assert!(docs.backend.procedures.is_empty());
    assert!(docs.ui.ui_actions.is_empty());
}

#[test]
fn unknown_parameter_types_keep_their_spelling() {
    let src = r#"
unit Reports;

interface

procedure Print(Doc: TReportDoc; var Data);

implementation

procedure Print(Doc: TReportDoc; var Data);
begin
  Doc.Render;
end;

end.
"#;
    let ctx = analyzed(&[src]);
    let print = ctx.procedure("Print").unwrap();
    let types: Vec<_> = print.parameter_types().into_values().collect();
    assert_eq!(types, vec!["TReportDoc", "object"]);
    assert!(!print.parameters["Doc"].is_resolved());
}

#[test]
fn analysis_is_idempotent() {
    let mut ctx = analyzed(&[MODEL, VIEW]);
    let registry = ctx.registry().clone();
    let procedures = ctx.procedures().to_vec();
    ctx.analyze();
    ctx.infer_effects();
    assert_eq!(ctx.registry(), &registry);
    assert_eq!(ctx.procedures(), procedures.as_slice());
}

#[test]
fn lowering_is_deterministic() {
    let render = || {
        let docs = lower_all(&analyzed(&[MODEL, VIEW]), &LoweringOptions::default());
        (
            serde_json::to_string_pretty(&docs.entities).unwrap(),
            serde_json::to_string_pretty(&docs.backend).unwrap(),
            serde_json::to_string_pretty(&docs.ui).unwrap(),
        )
    };
    let first = render();
    for _ in 0..3 {
        assert_eq!(render(), first);
    }
}
